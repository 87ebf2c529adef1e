//! Animation track command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use prettytable::{Cell, Row, Table};
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use gq_track::{AnimationState, SkeletonNode, Track, TrackFlags, tracks_for_tag};

#[derive(Subcommand)]
pub enum TrackCommands {
    /// Display the tracks stored in a raw track file
    Info {
        /// Path to the track file
        file: PathBuf,

        /// Offset of the first track, which next-track addresses are relative to (decimal or 0x hex)
        #[arg(long, default_value = "0", value_parser = parse_offset)]
        base_offset: u64,
    },

    /// Evaluate the tracks of one bone at the given ticks
    Sample {
        /// Path to the track file
        file: PathBuf,

        /// Tick to evaluate (can be repeated)
        #[arg(long = "tick", required = true, allow_negative_numbers = true)]
        ticks: Vec<f64>,

        /// Evaluate as if the animation was playing backwards
        #[arg(long)]
        reverse: bool,

        /// Tag of the bone to animate (defaults to the tag of the first track)
        #[arg(long, allow_negative_numbers = true)]
        tag: Option<i32>,

        /// Offset of the first track, which next-track addresses are relative to (decimal or 0x hex)
        #[arg(long, default_value = "0", value_parser = parse_offset)]
        base_offset: u64,
    },
}

pub fn execute(command: TrackCommands) -> Result<()> {
    match command {
        TrackCommands::Info { file, base_offset } => execute_info(&file, base_offset),
        TrackCommands::Sample {
            file,
            ticks,
            reverse,
            tag,
            base_offset,
        } => execute_sample(&file, &ticks, reverse, tag, base_offset),
    }
}

fn parse_offset(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid offset '{value}': {e}"))
}

/// Load the chain of tracks starting at `base_offset`, following the HAS_NEXT flag
fn load_tracks(path: &Path, base_offset: u64) -> Result<Vec<Track>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .len();

    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(base_offset))?;

    let mut tracks = Vec::new();
    loop {
        let start = reader.stream_position()?;
        let track = Track::load(&mut reader, base_offset).with_context(|| {
            format!("Failed to parse track {} of {}", tracks.len(), path.display())
        })?;
        let has_next = track.flags().contains(TrackFlags::HAS_NEXT);
        tracks.push(track);

        if !has_next {
            break;
        }

        let position = reader.stream_position()?;
        if position >= file_size {
            log::warn!("Track {} has the HAS_NEXT flag, but the file ends", tracks.len() - 1);
            break;
        }
        if position <= start {
            log::warn!(
                "Track {} points back to {position:#X}, which is not after its start {start:#X}",
                tracks.len() - 1
            );
            break;
        }
    }

    log::debug!("Loaded {} track(s) from {}", tracks.len(), path.display());
    Ok(tracks)
}

fn execute_info(path: &Path, base_offset: u64) -> Result<()> {
    let tracks = load_tracks(path, base_offset)?;

    println!("\n{}", style("Track File Information").bold().underlined());
    println!("File: {}", style(path.display()).cyan());
    println!("Tracks: {}", style(tracks.len()).green());

    for (index, track) in tracks.iter().enumerate() {
        let control_type = track
            .control_type()
            .map_or_else(|_| "<unknown>".to_string(), |control_type| control_type.to_string());

        println!("\n{}", style(format!("Track {index}")).bold());
        println!("Control Type: {}", style(control_type).yellow());
        println!("Mode: {}", track.mode());
        println!("Flags: {:#X} ({:?})", track.flags().bits(), track.flags());
        println!("Tag: {}", style(track.tag).green());
        println!("Keys: {}", style(track.keys.len()).green());

        if !track.keys.is_empty() {
            let mut table = Table::new();
            table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
            table.set_titles(Row::new(vec![
                Cell::new("#").style_spec("b"),
                Cell::new("Tick").style_spec("b"),
                Cell::new("Key").style_spec("b"),
            ]));

            for (key_index, key) in track.keys.iter().enumerate() {
                table.add_row(Row::new(vec![
                    Cell::new(&key_index.to_string()),
                    Cell::new(&key.tick.to_string()),
                    Cell::new(&key.to_string()),
                ]));
            }

            table.printstd();
        }
    }

    Ok(())
}

fn execute_sample(
    path: &Path,
    ticks: &[f64],
    reverse: bool,
    tag: Option<i32>,
    base_offset: u64,
) -> Result<()> {
    let tracks = load_tracks(path, base_offset)?;
    let tag = match tag {
        Some(tag) => tag,
        None => tracks.first().map_or(0, |track| track.tag),
    };

    let track_count = tracks_for_tag(&tracks, tag).count();
    if track_count == 0 {
        log::warn!("No track animates tag {tag}");
    }

    let node = SkeletonNode::new(format!("tag_{tag}"), tag);
    let mut state = AnimationState::new();

    println!("\n{}", style("Track Sampling").bold().underlined());
    println!("File: {}", style(path.display()).cyan());
    println!("Tag: {} ({track_count} track(s))", style(tag).green());
    println!("Direction: {}", if reverse { "reverse" } else { "forward" });

    for &tick in ticks {
        state.reset(&node);
        let still_animating = state
            .evaluate(&node, tick, tracks_for_tag(&tracks, tag), reverse)
            .with_context(|| format!("Failed to evaluate tick {tick}"))?;

        let matrix = state.local_offset_matrix();
        println!("\n{}", style(format!("Tick {tick}")).bold());
        println!("Position: {}", state.position);
        println!("Rotation: {}", glam::Vec4::from(state.rotation));
        println!("Scale: {}", state.scale);
        println!("Still Animating: {still_animating}");
        println!("Matrix:");
        for row in 0..4 {
            println!("  {}", matrix.row(row));
        }
    }

    Ok(())
}
