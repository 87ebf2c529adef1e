//! Linear keys: a single vector, lerped (position/scale) or slerped (rotation)

use glam::{Vec3, Vec4};
use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::io_ext::{ReadVectorExt, WriteVectorExt};
use crate::math;

/// Payload of the LINEAR_POSITION, LINEAR_ROTATION and LINEAR_SCALE control types
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearKey {
    /// xyz for position and scale, a quaternion for rotation
    pub vector: Vec4,
}

impl LinearKey {
    pub fn new(vector: Vec4) -> Self {
        Self { vector }
    }

    pub(crate) fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            vector: reader.read_vec4()?,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_vec4(self.vector)?;
        Ok(())
    }

    /// Lerp from the previous key (or the rest value) towards this key.
    pub fn interpolate_vector(&self, previous: Option<&Self>, rest: Vec3, t: f32) -> Vec3 {
        let from = previous.map_or(rest, |key| key.vector.truncate());
        math::lerp_vec3(from, self.vector.truncate(), t)
    }

    /// Slerp from the previous key (or the rest rotation) towards this key.
    pub fn interpolate_rotation(&self, previous: Option<&Self>, rest: Vec4, t: f32) -> Vec4 {
        let from = previous.map_or(rest, |key| key.vector);
        math::slerp(from, self.vector, t)
    }
}

impl fmt::Display for LinearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector: {}", self.vector)
    }
}
