//! Control types: the tag which fixes a key's payload layout

use std::fmt;

use crate::error::{Result, TrackError};

/// The channel of the animation state which a key writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    Position,
    Rotation,
    Scale,
}

/// Interpolation family and channel of every key in a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControlType {
    LinearPosition = 0,
    LinearRotation = 1,
    LinearScale = 2,
    BezierPosition = 3,
    TcbPosition = 4,
    TcbRotation = 5,
}

/// Payload size of a single 4-component float vector
const VECTOR4_SIZE: usize = 16;
/// Payload size of a single 3-component float vector
const VECTOR3_SIZE: usize = 12;

impl ControlType {
    /// All known control types, in raw value order
    pub const ALL: [Self; 6] = [
        Self::LinearPosition,
        Self::LinearRotation,
        Self::LinearScale,
        Self::BezierPosition,
        Self::TcbPosition,
        Self::TcbRotation,
    ];

    /// Parse the raw value stored in the packed track value
    pub fn from_raw(raw: u8) -> Result<Self> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(TrackError::UnknownControlType(raw))
    }

    /// Raw value as stored in the packed track value
    pub fn to_raw(self) -> u8 {
        self as u8
    }

    /// The pose channel written by keys of this type
    pub fn channel(self) -> Channel {
        match self {
            Self::LinearPosition | Self::BezierPosition | Self::TcbPosition => Channel::Position,
            Self::LinearRotation | Self::TcbRotation => Channel::Rotation,
            Self::LinearScale => Channel::Scale,
        }
    }

    /// Number of payload bytes which follow the key's tick
    pub fn data_byte_length(self) -> usize {
        match self {
            Self::LinearPosition | Self::LinearRotation | Self::LinearScale => VECTOR4_SIZE,
            // end, start, control, flags
            Self::BezierPosition => 3 * VECTOR4_SIZE + 4,
            // vector01, vector05, unused, easeTo, easeFrom, vector0E, vector12
            Self::TcbPosition | Self::TcbRotation => 4 * VECTOR4_SIZE + VECTOR3_SIZE + 2 * 4,
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LinearPosition => "LINEAR_POSITION",
            Self::LinearRotation => "LINEAR_ROTATION",
            Self::LinearScale => "LINEAR_SCALE",
            Self::BezierPosition => "BEZIER_POSITION",
            Self::TcbPosition => "TCB_POSITION",
            Self::TcbRotation => "TCB_ROTATION",
        };
        f.write_str(name)
    }
}
