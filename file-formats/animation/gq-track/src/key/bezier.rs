//! Cubic Bezier position keys

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec3, Vec4};
use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::flags::warn_about_invalid_bit_flags;
use crate::io_ext::{ReadVectorExt, WriteVectorExt};

/// Bezier key flag word.
///
/// Bits 7-9 hold the start position mode, bits 10-12 the mode selection.
/// Everything else is unused, but kept so that saving reproduces the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BezierFlags(pub u32);

impl BezierFlags {
    const START_MODE_SHIFT: u32 = 7;
    const MODE_SELECTION_SHIFT: u32 = 10;
    const MODE_MASK: u32 = 0b111;

    /// Every bit with a known meaning
    pub const KNOWN_MASK: u32 = (Self::MODE_MASK << Self::START_MODE_SHIFT)
        | (Self::MODE_MASK << Self::MODE_SELECTION_SHIFT);

    /// Mode value which turns the segment into a step
    pub const STEP_MODE: u32 = 2;

    pub fn start_mode(self) -> u32 {
        (self.0 >> Self::START_MODE_SHIFT) & Self::MODE_MASK
    }

    pub fn mode_selection(self) -> u32 {
        (self.0 >> Self::MODE_SELECTION_SHIFT) & Self::MODE_MASK
    }
}

/// Payload of the BEZIER_POSITION control type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BezierPositionKey {
    pub end_position: Vec4,
    pub start_position: Vec4,
    pub control_position: Vec4,
    pub flags: BezierFlags,
}

impl Default for BezierPositionKey {
    fn default() -> Self {
        Self {
            end_position: Vec4::W,
            start_position: Vec4::W,
            control_position: Vec4::W,
            flags: BezierFlags::default(),
        }
    }
}

impl BezierPositionKey {
    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let key = Self {
            end_position: reader.read_vec4()?,
            start_position: reader.read_vec4()?,
            control_position: reader.read_vec4()?,
            flags: BezierFlags(reader.read_u32::<LittleEndian>()?),
        };

        key.validate();
        Ok(key)
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_vec4(self.end_position)?;
        writer.write_vec4(self.start_position)?;
        writer.write_vec4(self.control_position)?;
        writer.write_u32::<LittleEndian>(self.flags.0)?;
        Ok(())
    }

    /// Warn about data the evaluator does not expect. Nothing is modified.
    fn validate(&self) {
        for (name, position) in [
            ("endPosition", self.end_position),
            ("startPosition", self.start_position),
            ("controlPosition", self.control_position),
        ] {
            if position.w != 1.0 {
                log::warn!("Bezier key {name} had a W component of {}, expected 1.0", position.w);
            }
        }

        warn_about_invalid_bit_flags(self.flags.0, BezierFlags::KNOWN_MASK, "Bezier key");
    }

    /// Evaluate the segment ending at this key.
    ///
    /// `previous` is the key (and its tick) the segment starts at. Without it the
    /// value snaps from the start position to the end position halfway through
    /// the segment, an approximation which has not been checked against the game.
    pub fn interpolate(&self, tick: i32, previous: Option<(i32, &Self)>, t: f32) -> Vec3 {
        let Some((previous_tick, previous)) = previous else {
            return if t >= 0.5 {
                self.end_position.truncate()
            } else {
                self.start_position.truncate()
            };
        };

        if previous.flags.mode_selection() == BezierFlags::STEP_MODE
            || self.flags.start_mode() == BezierFlags::STEP_MODE
        {
            return if t == 1.0 {
                self.end_position.truncate()
            } else {
                previous.end_position.truncate()
            };
        }

        let coefficient = (f64::from(tick) - f64::from(previous_tick)) as f32 / 3.0;
        let c1 = previous.control_position;
        let c1_end = previous.end_position;
        let c2_start = self.start_position;
        let c2_end = self.end_position;

        let inv_t = 1.0 - t;
        let t2 = t * t;
        let t3 = t2 * t;

        let axis = |c1: f32, c1_end: f32, c2_start: f32, c2_end: f32| {
            c2_end * t3
                + inv_t
                    * (3.0 * t2 * (c2_end + c2_start * coefficient)
                        + inv_t * (inv_t * c1_end + 3.0 * t * (c1_end + c1 * coefficient)))
        };

        Vec3::new(
            axis(c1.x, c1_end.x, c2_start.x, c2_end.x),
            axis(c1.y, c1_end.y, c2_start.y, c2_end.y),
            axis(c1.z, c1_end.z, c2_start.z, c2_end.z),
        )
    }
}

impl fmt::Display for BezierPositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "End: {}, Start: {}, Control: {}, Flags: {:#X}",
            self.end_position, self.start_position, self.control_position, self.flags.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(end: Vec3, start: Vec3, control: Vec3, flags: u32) -> BezierPositionKey {
        BezierPositionKey {
            end_position: end.extend(1.0),
            start_position: start.extend(1.0),
            control_position: control.extend(1.0),
            flags: BezierFlags(flags),
        }
    }

    #[test]
    fn test_flag_fields() {
        let flags = BezierFlags((2 << 7) | (5 << 10) | 1);
        assert_eq!(flags.start_mode(), 2);
        assert_eq!(flags.mode_selection(), 5);
        assert_eq!(BezierFlags::KNOWN_MASK, 0x1F80);
    }

    #[test]
    fn test_no_previous_is_step_at_half() {
        let k = key(Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 0);

        assert_eq!(k.interpolate(10, None, 0.3), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(k.interpolate(10, None, 0.5), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(k.interpolate(10, None, 0.7), Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_step_mode_from_previous_mode_selection() {
        let previous = key(Vec3::splat(1.0), Vec3::ZERO, Vec3::ZERO, 2 << 10);
        let current = key(Vec3::splat(9.0), Vec3::ZERO, Vec3::ZERO, 0);

        assert_eq!(current.interpolate(10, Some((0, &previous)), 0.0), Vec3::splat(1.0));
        assert_eq!(current.interpolate(10, Some((0, &previous)), 0.99), Vec3::splat(1.0));
        assert_eq!(current.interpolate(10, Some((0, &previous)), 1.0), Vec3::splat(9.0));
    }

    #[test]
    fn test_step_mode_from_own_start_mode() {
        let previous = key(Vec3::splat(1.0), Vec3::ZERO, Vec3::ZERO, 0);
        let current = key(Vec3::splat(9.0), Vec3::ZERO, Vec3::ZERO, 2 << 7);

        assert_eq!(current.interpolate(10, Some((0, &previous)), 0.5), Vec3::splat(1.0));
        assert_eq!(current.interpolate(10, Some((0, &previous)), 1.0), Vec3::splat(9.0));
    }

    #[test]
    fn test_cubic_endpoints() {
        let previous = key(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::new(0.5, 0.5, 0.5), 0);
        let current = key(
            Vec3::new(7.0, 8.0, 9.0),
            Vec3::new(-0.5, 0.0, 0.5),
            Vec3::ZERO,
            0,
        );

        assert_eq!(current.interpolate(30, Some((0, &previous)), 0.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(current.interpolate(30, Some((0, &previous)), 1.0), Vec3::new(7.0, 8.0, 9.0));
    }

    #[test]
    fn test_cubic_midpoint_formula() {
        let previous = key(Vec3::ZERO, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0);
        let current = key(Vec3::new(3.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), Vec3::ZERO, 0);

        // coefficient = (6 - 0) / 3 = 2
        // c2End*t3 + invT*(3*t2*(c2End + c2Start*2) + invT*(invT*c1End + 3*t*(c1End + c1*2)))
        // = 3*0.125 + 0.5*(3*0.25*(3 - 2) + 0.5*(0 + 1.5*2)) = 0.375 + 0.5*(0.75 + 1.5)
        let value = current.interpolate(6, Some((0, &previous)), 0.5);
        assert!((value.x - 1.5).abs() < 1e-6);
        assert_eq!(value.y, 0.0);
        assert_eq!(value.z, 0.0);
    }

    #[test]
    fn test_cubic_with_ticks_far_apart() {
        let previous = key(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, 0);
        let current = key(Vec3::new(8.0, 0.0, 0.0), Vec3::ZERO, Vec3::ZERO, 0);

        let value = current.interpolate(2_000_000_000, Some((-2_000_000_000, &previous)), 0.5);
        assert_eq!(value, Vec3::new(4.0, 0.0, 0.0));

        let tangents = key(Vec3::ONE, Vec3::ONE, Vec3::ONE, 0);
        let value = tangents.interpolate(i32::MAX, Some((i32::MIN, &tangents)), 0.25);
        assert!(value.is_finite());
    }
}
