//! Track keys
//!
//! Every key is a tick followed by a fixed-size payload whose layout depends
//! only on the track's control type. Loading and saving always leave the
//! stream exactly at the end of that payload, even when the payload itself
//! is malformed, so one bad key never breaks the rest of a track.

mod bezier;
mod linear;
pub mod tcb;

pub use bezier::{BezierFlags, BezierPositionKey};
pub use linear::LinearKey;
pub use tcb::TcbKey;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec3, Vec4};
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::control_type::ControlType;
use crate::error::Result;
use crate::node::Bone;

/// Size of the tick which precedes every key payload
pub const TICK_SIZE: usize = 4;

/// Interpolation payload of a key, one variant per control type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyValue {
    LinearPosition(LinearKey),
    LinearRotation(LinearKey),
    LinearScale(LinearKey),
    BezierPosition(BezierPositionKey),
    TcbPosition(TcbKey),
    TcbRotation(TcbKey),
}

impl KeyValue {
    /// Payload used when a key's data could not be read
    pub fn default_for(control_type: ControlType) -> Self {
        match control_type {
            ControlType::LinearPosition => Self::LinearPosition(LinearKey::default()),
            ControlType::LinearRotation => {
                Self::LinearRotation(LinearKey::new(crate::math::IDENTITY))
            }
            ControlType::LinearScale => Self::LinearScale(LinearKey::new(Vec4::ONE)),
            ControlType::BezierPosition => Self::BezierPosition(BezierPositionKey::default()),
            ControlType::TcbPosition => Self::TcbPosition(TcbKey::default()),
            ControlType::TcbRotation => Self::TcbRotation(TcbKey::default()),
        }
    }

    pub fn control_type(&self) -> ControlType {
        match self {
            Self::LinearPosition(_) => ControlType::LinearPosition,
            Self::LinearRotation(_) => ControlType::LinearRotation,
            Self::LinearScale(_) => ControlType::LinearScale,
            Self::BezierPosition(_) => ControlType::BezierPosition,
            Self::TcbPosition(_) => ControlType::TcbPosition,
            Self::TcbRotation(_) => ControlType::TcbRotation,
        }
    }

    fn read<R: Read>(reader: &mut R, control_type: ControlType) -> Result<Self> {
        Ok(match control_type {
            ControlType::LinearPosition => Self::LinearPosition(LinearKey::read(reader)?),
            ControlType::LinearRotation => Self::LinearRotation(LinearKey::read(reader)?),
            ControlType::LinearScale => Self::LinearScale(LinearKey::read(reader)?),
            ControlType::BezierPosition => Self::BezierPosition(BezierPositionKey::read(reader)?),
            ControlType::TcbPosition => Self::TcbPosition(TcbKey::read(reader)?),
            ControlType::TcbRotation => Self::TcbRotation(TcbKey::read(reader)?),
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::LinearPosition(key) | Self::LinearRotation(key) | Self::LinearScale(key) => {
                key.write(writer)
            }
            Self::BezierPosition(key) => key.write(writer),
            Self::TcbPosition(key) | Self::TcbRotation(key) => key.write(writer),
        }
    }
}

/// The value a key produces for one channel of the animation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Position(Vec3),
    /// Quaternion, x/y/z/w
    Rotation(Vec4),
    Scale(Vec3),
}

/// A single keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackKey {
    /// Tick at which this key's value is reached
    pub tick: i32,
    pub value: KeyValue,
}

impl TrackKey {
    pub fn new(tick: i32, value: KeyValue) -> Self {
        Self { tick, value }
    }

    pub fn control_type(&self) -> ControlType {
        self.value.control_type()
    }

    /// Number of payload bytes following the tick
    pub fn expected_data_byte_length(&self) -> usize {
        self.control_type().data_byte_length()
    }

    /// Total serialized size, including the tick
    pub fn byte_size(&self) -> usize {
        TICK_SIZE + self.expected_data_byte_length()
    }

    pub fn as_linear(&self) -> Option<&LinearKey> {
        match &self.value {
            KeyValue::LinearPosition(key)
            | KeyValue::LinearRotation(key)
            | KeyValue::LinearScale(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_bezier(&self) -> Option<&BezierPositionKey> {
        match &self.value {
            KeyValue::BezierPosition(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_tcb(&self) -> Option<&TcbKey> {
        match &self.value {
            KeyValue::TcbPosition(key) | KeyValue::TcbRotation(key) => Some(key),
            _ => None,
        }
    }

    /// Read a key of the given control type.
    ///
    /// Only a failure to read the tick (or to reposition the stream) is
    /// returned as an error. A payload which cannot be read is logged and
    /// replaced by the control type's default payload; in every case the
    /// reader is left at the end of the fixed-size payload.
    pub fn load<R: Read + Seek>(reader: &mut R, control_type: ControlType) -> Result<Self> {
        let tick = reader.read_i32::<LittleEndian>()?;
        let data_start = reader.stream_position()?;
        let expected_end = data_start + control_type.data_byte_length() as u64;

        let value = match KeyValue::read(reader, control_type) {
            Ok(value) => {
                let data_end = reader.stream_position()?;
                if data_end != expected_end {
                    log::error!(
                        "{control_type} key at tick {tick} was expected to end at {expected_end:#X}, but ended at {data_end:#X}"
                    );
                    reader.seek(SeekFrom::Start(expected_end))?;
                }
                value
            }
            Err(e) => {
                log::error!("Failed to read {control_type} key data at tick {tick}: {e}");
                reader.seek(SeekFrom::Start(expected_end))?;
                KeyValue::default_for(control_type)
            }
        };

        Ok(Self { tick, value })
    }

    /// Write this key, mirroring [`TrackKey::load`].
    ///
    /// A payload which fails to write, or writes the wrong number of bytes, is
    /// logged and the writer is moved to where the payload should have ended.
    pub fn save<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.tick)?;
        let data_start = writer.stream_position()?;
        let expected_end = data_start + self.expected_data_byte_length() as u64;

        if let Err(e) = self.value.write(writer) {
            log::error!("Failed to write {self}: {e}");
            writer.seek(SeekFrom::Start(expected_end))?;
            return Ok(());
        }

        let data_end = writer.stream_position()?;
        if data_end != expected_end {
            log::error!(
                "{self} was expected to end at {expected_end:#X}, but ended at {data_end:#X}"
            );
            writer.seek(SeekFrom::Start(expected_end))?;
        }

        Ok(())
    }

    /// Compute this key's contribution for the segment starting at `previous`.
    ///
    /// `previous` is ignored if it belongs to a different interpolation family.
    pub fn interpolate<B: Bone + ?Sized>(
        &self,
        bone: &B,
        previous: Option<&TrackKey>,
        t: f32,
    ) -> ChannelValue {
        match &self.value {
            KeyValue::LinearPosition(key) => ChannelValue::Position(key.interpolate_vector(
                previous.and_then(Self::as_linear),
                bone.local_position(),
                t,
            )),
            KeyValue::LinearScale(key) => ChannelValue::Scale(key.interpolate_vector(
                previous.and_then(Self::as_linear),
                bone.local_scale(),
                t,
            )),
            KeyValue::LinearRotation(key) => ChannelValue::Rotation(key.interpolate_rotation(
                previous.and_then(Self::as_linear),
                Vec4::from(bone.local_rotation()),
                t,
            )),
            KeyValue::BezierPosition(key) => {
                let previous = previous.and_then(|p| p.as_bezier().map(|b| (p.tick, b)));
                ChannelValue::Position(key.interpolate(self.tick, previous, t))
            }
            KeyValue::TcbPosition(key) => ChannelValue::Position(
                key.interpolate_position(previous.and_then(Self::as_tcb), t),
            ),
            KeyValue::TcbRotation(key) => ChannelValue::Rotation(
                key.interpolate_rotation(previous.and_then(Self::as_tcb), t),
            ),
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{Tick={}", self.control_type(), self.tick)?;
        match &self.value {
            KeyValue::LinearPosition(key)
            | KeyValue::LinearRotation(key)
            | KeyValue::LinearScale(key) => write!(f, ", {key}")?,
            KeyValue::BezierPosition(key) => write!(f, ", {key}")?,
            KeyValue::TcbPosition(key) | KeyValue::TcbRotation(key) => write!(f, ", {key}")?,
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SkeletonNode;
    use glam::Quat;
    use std::io::Cursor;

    #[test]
    fn test_expected_lengths() {
        let key = TrackKey::new(0, KeyValue::default_for(ControlType::TcbRotation));
        assert_eq!(key.expected_data_byte_length(), 84);
        assert_eq!(key.byte_size(), 88);
    }

    #[test]
    fn test_save_writes_fixed_length() {
        for control_type in ControlType::ALL {
            let key = TrackKey::new(7, KeyValue::default_for(control_type));
            let mut cursor = Cursor::new(Vec::new());
            key.save(&mut cursor).unwrap();
            assert_eq!(cursor.get_ref().len(), key.byte_size(), "{control_type}");
        }
    }

    #[test]
    fn test_truncated_payload_recovers() {
        // Tick followed by only half of a linear payload.
        let mut data = 12i32.to_le_bytes().to_vec();
        data.extend_from_slice(&1.0f32.to_le_bytes());
        data.extend_from_slice(&2.0f32.to_le_bytes());

        let mut cursor = Cursor::new(data);
        let key = TrackKey::load(&mut cursor, ControlType::LinearPosition).unwrap();

        assert_eq!(key.tick, 12);
        assert_eq!(key.value, KeyValue::default_for(ControlType::LinearPosition));
        assert_eq!(cursor.position(), 20);
    }

    #[test]
    fn test_missing_tick_is_an_error() {
        let mut cursor = Cursor::new(vec![0u8; 2]);
        assert!(TrackKey::load(&mut cursor, ControlType::LinearScale).is_err());
    }

    #[test]
    fn test_load_consumes_exact_length() {
        let key = TrackKey::new(
            3,
            KeyValue::BezierPosition(BezierPositionKey {
                flags: BezierFlags(0x100),
                ..BezierPositionKey::default()
            }),
        );

        let mut cursor = Cursor::new(Vec::new());
        key.save(&mut cursor).unwrap();
        cursor.get_mut().extend_from_slice(&[0xAA; 8]);
        cursor.set_position(0);

        let loaded = TrackKey::load(&mut cursor, ControlType::BezierPosition).unwrap();
        assert_eq!(loaded, key);
        assert_eq!(cursor.position(), key.byte_size() as u64);
    }

    #[test]
    fn test_interpolate_ignores_mismatched_previous() {
        let bone = SkeletonNode::new("bone", 1).with_rest_pose(
            Vec3::new(1.0, 1.0, 1.0),
            Quat::IDENTITY,
            Vec3::ONE,
        );
        let previous = TrackKey::new(0, KeyValue::default_for(ControlType::TcbPosition));
        let key = TrackKey::new(
            10,
            KeyValue::LinearPosition(LinearKey::new(Vec4::new(3.0, 3.0, 3.0, 1.0))),
        );

        assert_eq!(
            key.interpolate(&bone, Some(&previous), 0.5),
            ChannelValue::Position(Vec3::new(2.0, 2.0, 2.0))
        );
    }

    #[test]
    fn test_interpolate_scale_uses_rest_scale() {
        let bone = SkeletonNode::new("bone", 1).with_rest_pose(
            Vec3::ZERO,
            Quat::IDENTITY,
            Vec3::splat(2.0),
        );
        let key = TrackKey::new(
            10,
            KeyValue::LinearScale(LinearKey::new(Vec4::new(4.0, 4.0, 4.0, 0.0))),
        );

        assert_eq!(
            key.interpolate(&bone, None, 0.5),
            ChannelValue::Scale(Vec3::splat(3.0))
        );
    }

    #[test]
    fn test_display() {
        let key = TrackKey::new(5, KeyValue::default_for(ControlType::LinearScale));
        assert_eq!(key.to_string(), "LINEAR_SCALE{Tick=5, Vector: [1, 1, 1, 1]}");
    }
}
