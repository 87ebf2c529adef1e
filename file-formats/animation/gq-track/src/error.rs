use std::io;
use thiserror::Error;

/// Error types for track parsing and evaluation
#[derive(Error, Debug)]
pub enum TrackError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Evaluation was requested at a tick which is NaN or infinite
    #[error("Invalid animation tick: {0}")]
    InvalidTick(f64),

    /// The packed track value names a control type with no known key layout
    #[error("Unknown control type: {0}")]
    UnknownControlType(u8),

    /// Track flags contained bits outside of the flag field
    #[error("Invalid track flags {flags:#X}: bits outside of the flag mask {mask:#X}")]
    InvalidFlags { flags: u32, mask: u32 },

    /// The key list cannot be described by the 32-bit key count
    #[error("Too many keys in track: {0}")]
    TooManyKeys(usize),
}

/// Result type using TrackError
pub type Result<T> = std::result::Result<T, TrackError>;
