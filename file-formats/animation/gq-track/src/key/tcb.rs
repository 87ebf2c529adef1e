//! TCB (tension, continuity, bias) keys, a Kochanek-Bartels Hermite spline.
//!
//! The tension, continuity and bias values are not stored directly. They are
//! pre-baked into the tangent vectors (`vector0E`, `vector12`) by the exporter,
//! so evaluation only needs the Hermite basis functions plus the ease curve.
//!
//! Rotation keys use `vector05` as an axis (xyz) and an angle (w). Rotations of
//! more than half a turn per segment go through an angle-unwrapping path which
//! mirrors the game's code branch for branch.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec3, Vec4};
use std::f32::consts::PI;
use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::io_ext::{ReadVectorExt, WriteVectorExt};
use crate::math::{self, IDENTITY};

/// Threshold used by the game when unwrapping half angles, slightly below pi.
const UNWRAP_THRESHOLD: f64 = 3.1415918;

/// Payload shared by the TCB_POSITION and TCB_ROTATION control types
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct TcbKey {
    /// Key value. Position for TCB_POSITION (w = 1), a quaternion for TCB_ROTATION.
    pub vector01: Vec4,
    /// Axis (xyz) and angle (w) for rotation keys
    pub vector05: Vec4,
    /// Always zero in retail data, except for the occasional X component
    pub unused: Vec3,
    /// Slows the curve as it approaches this key
    pub ease_to: f32,
    /// Slows the curve as it leaves this key
    pub ease_from: f32,
    /// Incoming tangent
    pub vector0e: Vec4,
    /// Outgoing tangent
    pub vector12: Vec4,
}

impl Default for TcbKey {
    fn default() -> Self {
        Self {
            vector01: IDENTITY,
            vector05: Vec4::ZERO,
            unused: Vec3::ZERO,
            ease_to: 0.0,
            ease_from: 0.0,
            vector0e: Vec4::ZERO,
            vector12: Vec4::ZERO,
        }
    }
}

/// Remaps `t` so the curve starts and stops gently.
///
/// `a` is the ease-from weight of the previous key, `b` the ease-to weight of
/// the current one. Weights which sum above one are normalized.
pub fn ease(t: f32, a: f32, b: f32) -> f32 {
    let total = a + b;
    if t == 0.0 || t == 1.0 || total == 0.0 {
        return t;
    }

    let (a, b) = if total > 1.0 {
        (a / total, b / total)
    } else {
        (a, b)
    };

    let inverse = 1.0 / (2.0 - a - b);
    if a > t {
        t * (inverse / a)
    } else if b - 1.0 > t {
        inverse * ((2.0 * t) - a)
    } else {
        1.0 - ((1.0 - t) * (inverse / b))
    }
}

/// Remove half turns from `half_angle` until it is at most the unwrap threshold.
///
/// Returns the number of half turns removed and the remaining angle. Once pi
/// is below the precision of `half_angle` the remainder is computed directly.
fn unwrap_half_angle(mut half_angle: f32) -> (f32, f32) {
    let mut turns = 0.0f32;
    while f64::from(half_angle) > UNWRAP_THRESHOLD {
        let next = half_angle - PI;
        if next == half_angle {
            let excess = f64::from(half_angle) - UNWRAP_THRESHOLD;
            let remainder = excess.rem_euclid(f64::from(PI));
            let remaining = if remainder == 0.0 {
                UNWRAP_THRESHOLD
            } else {
                UNWRAP_THRESHOLD - f64::from(PI) + remainder
            };
            let removed = (excess / f64::from(PI)).ceil();
            return (turns + removed as f32, remaining as f32);
        }

        turns += 1.0;
        half_angle = next;
    }

    (turns, half_angle)
}

/// Subtract 2 until `value` is below 2, falling back to `%` when the
/// subtraction stops changing the value.
fn wrap_below_two(mut value: f32) -> f32 {
    while value >= 2.0 {
        let next = value - 2.0;
        if next == value {
            return value % 2.0;
        }
        value = next;
    }
    value
}

impl TcbKey {
    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let key = Self {
            vector01: reader.read_vec4()?,
            vector05: reader.read_vec4()?,
            unused: reader.read_vec3()?,
            ease_to: reader.read_f32::<LittleEndian>()?,
            ease_from: reader.read_f32::<LittleEndian>()?,
            vector0e: reader.read_vec4()?,
            vector12: reader.read_vec4()?,
        };

        if key.unused.y != 0.0 || key.unused.z != 0.0 {
            log::warn!(
                "Expected unused TCB vector to be all zeros, but actually was: {}",
                key.unused
            );
        }
        if key.ease_from != 0.0 || key.ease_to != 0.0 {
            log::warn!(
                "Expected TCB ease values to be 0.0, but found [easeFrom: {}, easeTo: {}]",
                key.ease_from,
                key.ease_to
            );
        }
        if !key.vector05.w.is_finite() {
            log::warn!("TCB key angle was {}, it will not be unwrapped", key.vector05.w);
        }

        Ok(key)
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_vec4(self.vector01)?;
        writer.write_vec4(self.vector05)?;
        writer.write_vec3(self.unused)?;
        writer.write_f32::<LittleEndian>(self.ease_to)?;
        writer.write_f32::<LittleEndian>(self.ease_from)?;
        writer.write_vec4(self.vector0e)?;
        writer.write_vec4(self.vector12)?;
        Ok(())
    }

    fn eased(&self, previous: Option<&Self>, t: f32) -> f32 {
        ease(t, previous.map_or(0.0, |key| key.ease_from), self.ease_to)
    }

    /// Hermite position for the segment ending at this key.
    pub fn interpolate_position(&self, previous: Option<&Self>, t: f32) -> Vec3 {
        let t = self.eased(previous, t);

        let t2 = t * t;
        let t3 = t * t2;
        let h4 = t3 - t2; // tangent 2
        let h3 = t3 - (2.0 * t2) + t; // tangent 1
        let h2 = -(2.0 * t3) + (3.0 * t2); // end position
        let h1 = -h2 + 1.0; // start position

        let prev_vec01 = previous.map_or(IDENTITY, |key| key.vector01);
        let prev_vec12 = previous.map_or(IDENTITY, |key| key.vector12);
        let cur_vec01 = self.vector01;
        let cur_vec0e = self.vector0e;

        let axis = |tangent2: f32, tangent1: f32, end: f32, start: f32| {
            (tangent2 * h4) + (tangent1 * h3) + (end * h2) + (start * h1)
        };

        Vec3::new(
            axis(cur_vec0e.x, prev_vec12.x, cur_vec01.x, prev_vec01.x),
            axis(cur_vec0e.y, prev_vec12.y, cur_vec01.y, prev_vec01.y),
            axis(cur_vec0e.z, prev_vec12.z, cur_vec01.z, prev_vec01.z),
        )
    }

    /// Rotation for the segment ending at this key.
    pub fn interpolate_rotation(&self, previous: Option<&Self>, t: f32) -> Vec4 {
        let t = self.eased(previous, t);

        let angle = self.vector05.w;
        let half_angle = angle * 0.5;
        let prev_vector01 = previous.map_or(IDENTITY, |key| key.vector01);
        let prev_vector12 = previous.map_or(IDENTITY, |key| key.vector12);

        // Non-finite angles never unwrap.
        if half_angle <= PI || !angle.is_finite() {
            let a = math::slerp(prev_vector01, self.vector01, t);
            let b = math::slerp(prev_vector12, self.vector0e, t);
            return math::slerp(a, b, (1.0 - t) * 2.0 * t);
        }

        let (mut calc_angle, mut half_angle) = unwrap_half_angle(half_angle);
        if half_angle < 0.0 {
            half_angle = 0.0;
        }

        let axis = self.vector05.truncate().extend(0.0);
        let mut normalized_angle = (t * angle) / PI;
        if normalized_angle < 1.0 {
            let target = math::quat_mul(prev_vector01, axis);
            let a = math::slerp(prev_vector01, target, normalized_angle);
            let b = math::slerp(prev_vector12, target, normalized_angle);
            return math::slerp(a, b, (1.0 - normalized_angle) * 2.0 * normalized_angle);
        }

        calc_angle = (normalized_angle + 1.0) - (calc_angle + half_angle / PI) * 2.0;
        if calc_angle <= 0.0 {
            normalized_angle = wrap_below_two(normalized_angle);

            let target = math::quat_mul(prev_vector01, axis);
            math::slerp(prev_vector01, target, normalized_angle)
        } else {
            // Negation stands in for the game's quaternion inverse here.
            let origin = -math::quat_mul(self.vector01, axis);
            let a = math::slerp(origin, self.vector01, calc_angle);
            let b = math::slerp(origin, self.vector0e, calc_angle);
            math::slerp(a, b, (1.0 - calc_angle) * 2.0 * calc_angle)
        }
    }
}

impl fmt::Display for TcbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vector 01: {}, Vector 05: {}, Vector 0E: {}, Vector 12: {}",
            self.vector01, self.vector05, self.vector0e, self.vector12
        )?;

        if self.ease_from != 0.0 {
            write!(f, ", Ease From: {}", self.ease_from)?;
        }
        if self.ease_to != 0.0 {
            write!(f, ", Ease To: {}", self.ease_to)?;
        }
        if self.unused != Vec3::ZERO {
            write!(f, ", Unused Vector: {}", self.unused)?;
        }

        Ok(())
    }
}
