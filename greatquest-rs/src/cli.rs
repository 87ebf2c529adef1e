//! Root CLI structure for greatquest-rs

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "greatquest-rs")]
#[command(about = "Command-line tools for Frogger: The Great Quest animation data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Animation track operations
    Track {
        #[command(subcommand)]
        command: crate::commands::track::TrackCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
