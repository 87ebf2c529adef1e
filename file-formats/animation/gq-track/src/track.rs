//! Animation track records
//!
//! A track holds every key of one control type for the bone with the same tag.
//! On disk it is a 20 byte header, a table of key offsets, and the keys:
//!
//! ```text
//! u32 packed_value   mode (bits 0-16) | flags (bits 17-23) | control type (bits 24-31)
//! i32 tag
//! u32 key_count
//! u32 runtime pointer (always 0 on disk)
//! u32 next_track_address, relative to the caller's base offset (0 for the last track)
//! u32 key_offsets[key_count], relative to the end of this table
//! keys...
//! ```

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::control_type::ControlType;
use crate::error::{Result, TrackError};
use crate::flags::warn_about_invalid_bit_flags;
use crate::key::TrackKey;

const TRACK_MODE_SIZE: u32 = 17;
const TRACK_MODE_MASK: u32 = (1 << TRACK_MODE_SIZE) - 1;
const FLAG_SIZE: u32 = 7;
const FLAG_MASK: u32 = (1 << FLAG_SIZE) - 1;
const CONTROL_TYPE_SHIFT: u32 = TRACK_MODE_SIZE + FLAG_SIZE;

/// Size of an offset or pointer field
const POINTER_SIZE: u64 = 4;

bitflags! {
    /// Track flags, relative to the flag field of the packed value
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
    pub struct TrackFlags: u32 {
        /// Another track follows this one
        const HAS_NEXT = 1 << 4;
        /// First track of its resource
        const IS_FIRST = 1 << 5;
        /// Set by the game at runtime, never seen in file data
        const IS_PACKED = 1 << 6;
    }
}

/// A sequence of keys animating one channel of one bone
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    /// Track mode, flags and control type
    pub packed_value: u32,
    /// Matches the tag of the skeleton node this track animates
    pub tag: i32,
    /// Keys in ascending tick order
    pub keys: Vec<TrackKey>,
}

impl Track {
    /// Create an empty track
    pub fn new(control_type: ControlType, tag: i32) -> Self {
        Self {
            packed_value: u32::from(control_type.to_raw()) << CONTROL_TYPE_SHIFT,
            tag,
            keys: Vec::new(),
        }
    }

    /// Create a track holding the given keys
    pub fn with_keys(control_type: ControlType, tag: i32, keys: Vec<TrackKey>) -> Self {
        Self {
            keys,
            ..Self::new(control_type, tag)
        }
    }

    pub fn control_type(&self) -> Result<ControlType> {
        ControlType::from_raw((self.packed_value >> CONTROL_TYPE_SHIFT) as u8)
    }

    /// Track mode. Only 0, 1 and 2 are expected, bit 2 affects TCB preparation in the game.
    pub fn mode(&self) -> u32 {
        self.packed_value & TRACK_MODE_MASK
    }

    pub fn flags(&self) -> TrackFlags {
        TrackFlags::from_bits_retain(self.raw_flags())
    }

    fn raw_flags(&self) -> u32 {
        (self.packed_value >> TRACK_MODE_SIZE) & FLAG_MASK
    }

    /// Replace the flag field of the packed value
    pub fn set_flags(&mut self, flags: TrackFlags) -> Result<()> {
        let bits = flags.bits();
        if bits & FLAG_MASK != bits {
            return Err(TrackError::InvalidFlags {
                flags: bits,
                mask: FLAG_MASK,
            });
        }

        self.packed_value =
            (self.packed_value & !(FLAG_MASK << TRACK_MODE_SIZE)) | (bits << TRACK_MODE_SIZE);
        Ok(())
    }

    fn update_flags(&mut self, is_first_track: bool, has_next_track: bool) -> Result<()> {
        let mut flags = self.flags();
        flags.set(TrackFlags::HAS_NEXT, has_next_track);
        flags.set(TrackFlags::IS_FIRST, is_first_track);
        self.set_flags(flags)
    }

    /// Index of the key whose interval contains `tick`.
    ///
    /// A key covers ticks from its own tick up to (excluding) the next key's
    /// tick, the last key covers everything after it up to `i32::MAX`
    /// (exclusive). Returns `None` when the tick is before the first key.
    pub fn key_index_for_tick(&self, tick: i32) -> Option<usize> {
        let mut left = 0usize;
        let mut right = self.keys.len();

        // Search within [left, right)
        while left < right {
            let mid = left + (right - left) / 2;
            let mid_tick = self.keys[mid].tick;
            let next_tick = self.keys.get(mid + 1).map_or(i32::MAX, |key| key.tick);

            if tick >= mid_tick && tick < next_tick {
                return Some(mid);
            } else if next_tick > tick {
                right = mid;
            } else {
                left = mid + 1;
            }
        }

        None
    }

    /// Read a track record.
    ///
    /// `base_offset` is the position the next-track address is relative to.
    /// The reader is left at the end of the record's key data.
    pub fn load<R: Read + Seek>(reader: &mut R, base_offset: u64) -> Result<Self> {
        let packed_value = reader.read_u32::<LittleEndian>()?;
        let tag = reader.read_i32::<LittleEndian>()?;
        let key_count = reader.read_u32::<LittleEndian>()?;
        let _runtime_pointer = reader.read_u32::<LittleEndian>()?;
        let next_track_address = reader.read_u32::<LittleEndian>()?;

        let offset_table_start = reader.stream_position()?;
        let key_data_start = offset_table_start + POINTER_SIZE * u64::from(key_count);
        let key_data_end = if next_track_address != 0 {
            u64::from(next_track_address) + base_offset
        } else {
            let end = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(offset_table_start))?;
            end
        };

        let mut track = Self {
            packed_value,
            tag,
            keys: Vec::with_capacity(key_count.min(u32::from(u16::MAX)) as usize),
        };
        let control_type = track.control_type()?;

        let mut last_tick: Option<i32> = None;
        let mut last_end: Option<u64> = None;
        for i in 0..u64::from(key_count) {
            reader.seek(SeekFrom::Start(offset_table_start + i * POINTER_SIZE))?;
            let data_offset = reader.read_u32::<LittleEndian>()?;
            let key_start = key_data_start + u64::from(data_offset);

            if let (Some(end), Some(previous)) = (last_end, track.keys.last()) {
                if key_start != end {
                    log::error!(
                        "The ending position of {previous} was expected to be {key_start:#X}, but was actually {end:#X}"
                    );
                }
            }

            reader.seek(SeekFrom::Start(key_start))?;
            let key = TrackKey::load(reader, control_type)?;
            last_end = Some(reader.stream_position()?);

            match last_tick {
                Some(tick) if tick == key.tick => {
                    log::error!("Track {tag} has two keys using tick {tick}");
                }
                Some(tick) if tick > key.tick => {
                    log::error!(
                        "Track {tag} has a key at tick {}, located after a key at tick {tick}",
                        key.tick
                    );
                }
                _ => {}
            }

            last_tick = Some(key.tick);
            track.keys.push(key);
        }

        if let Some(end) = last_end {
            if end != key_data_end {
                log::error!(
                    "The key data of track {tag} was expected to end at {key_data_end:#X}, but reading stopped at {end:#X}"
                );
            }
        }
        reader.seek(SeekFrom::Start(key_data_end))?;

        track.validate();
        Ok(track)
    }

    /// Log anything about the packed value which has not been seen in game data.
    fn validate(&self) {
        let flags = self.raw_flags();
        warn_about_invalid_bit_flags(flags, TrackFlags::all().bits(), "kcTrack");
        if flags & TrackFlags::IS_PACKED.bits() != 0 {
            log::warn!("Encountered a track with the IS_PACKED flag set (this has never been observed before)");
        }

        let mode = self.mode();
        if !matches!(mode, 0..=2) {
            log::error!("Encountered unexpected track mode of: {mode}");
        }
    }

    /// Write this track record.
    ///
    /// The IS_FIRST and HAS_NEXT flags are updated from the arguments. When
    /// `has_next_track` is set, the next-track address is written as the
    /// position after this record, relative to `base_offset`.
    pub fn save<W: Write + Seek>(
        &mut self,
        writer: &mut W,
        base_offset: u64,
        is_first_track: bool,
        has_next_track: bool,
    ) -> Result<()> {
        self.update_flags(is_first_track, has_next_track)?;
        let key_count =
            u32::try_from(self.keys.len()).map_err(|_| TrackError::TooManyKeys(self.keys.len()))?;

        writer.write_u32::<LittleEndian>(self.packed_value)?;
        writer.write_i32::<LittleEndian>(self.tag)?;
        writer.write_u32::<LittleEndian>(key_count)?;
        writer.write_u32::<LittleEndian>(0)?; // Runtime pointer
        let next_track_address_pos = writer.stream_position()?;
        writer.write_u32::<LittleEndian>(0)?;

        let offset_table_start = writer.stream_position()?;
        for _ in 0..key_count {
            writer.write_u32::<LittleEndian>(0)?;
        }

        let key_data_start = writer.stream_position()?;
        let mut offsets = Vec::with_capacity(self.keys.len());
        let mut last_tick = i32::MIN;
        for key in &self.keys {
            offsets.push(writer.stream_position()? - key_data_start);
            key.save(writer)?;

            if last_tick > key.tick {
                log::error!("Track {} is not sorted by tick ({key})", self.tag);
            }
            last_tick = key.tick;
        }
        let end = writer.stream_position()?;

        writer.seek(SeekFrom::Start(offset_table_start))?;
        for offset in offsets {
            writer.write_u32::<LittleEndian>(offset as u32)?;
        }

        if has_next_track {
            writer.seek(SeekFrom::Start(next_track_address_pos))?;
            writer.write_u32::<LittleEndian>(end.saturating_sub(base_offset) as u32)?;
        }

        writer.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    /// Serialized size of this record
    pub fn byte_size(&self) -> usize {
        5 * POINTER_SIZE as usize
            + self
                .keys
                .iter()
                .map(|key| POINTER_SIZE as usize + key.byte_size())
                .sum::<usize>()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.control_type() {
            Ok(control_type) => write!(f, "Track{{Type={control_type}")?,
            Err(_) => write!(f, "Track{{Type=<{:#X}>", self.packed_value >> CONTROL_TYPE_SHIFT)?,
        }
        write!(
            f,
            ",Flags={:#X},Mode={},Tag={},Keys={}}}",
            self.raw_flags(),
            self.mode(),
            self.tag,
            self.keys.len()
        )
    }
}

/// The tracks of an animation which animate the bone with the given tag
pub fn tracks_for_tag(tracks: &[Track], tag: i32) -> impl Iterator<Item = &Track> {
    tracks.iter().filter(move |track| track.tag == tag)
}
