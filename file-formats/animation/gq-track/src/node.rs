//! Skeleton nodes (bones) which animation tracks are applied to

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::flags::warn_about_invalid_bit_flags;
use crate::math;

/// Rest pose of a bone, as consumed by track evaluation.
pub trait Bone {
    /// Rest-pose position relative to the parent
    fn local_position(&self) -> Vec3;

    /// Rest-pose rotation relative to the parent
    fn local_rotation(&self) -> Quat;

    /// Rest-pose scale
    fn local_scale(&self) -> Vec3;

    /// Identifier shared between the skeleton and the tracks animating it
    fn tag(&self) -> i32;
}

bitflags! {
    /// Skeleton node flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
    pub struct NodeFlags: u32 {
        /// The node carries a rest position
        const HAS_POSITION = 0x01;
        /// The node carries a rest rotation
        const HAS_ROTATION = 0x02;
        /// The node carries a rest scale (only honored during animation)
        const HAS_SCALE = 0x04;
        /// Node data is a raw matrix instead of position/rotation/scale, never seen in game data
        const IS_MATRIX = 0x08;
        /// Always set, never checked by the game
        const UNKNOWN_05 = 0x20;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::HAS_POSITION | Self::HAS_ROTATION | Self::HAS_SCALE | Self::UNKNOWN_05
    }
}

/// A single bone of a skeleton hierarchy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct SkeletonNode {
    pub name: String,
    pub tag: i32,
    pub flags: NodeFlags,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl SkeletonNode {
    /// Create a node with the default flags and an identity rest pose
    pub fn new(name: impl Into<String>, tag: i32) -> Self {
        Self {
            name: name.into(),
            tag,
            flags: NodeFlags::default(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Set the rest pose
    pub fn with_rest_pose(mut self, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
        self
    }

    /// Build node flags from raw data, logging any bits the game does not use
    pub fn flags_from_raw(raw: u32) -> NodeFlags {
        warn_about_invalid_bit_flags(raw, NodeFlags::all().bits(), "kcNode");
        NodeFlags::from_bits_retain(raw)
    }

    pub fn has_position(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_POSITION)
    }

    pub fn has_rotation(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_ROTATION)
    }

    pub fn has_scale(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_SCALE)
    }

    /// Rest-pose matrix of this node without any animation applied.
    ///
    /// Scale is left out, the game only applies node scale while animating.
    /// The translation is only used when the tag is non-zero.
    pub fn local_offset_matrix(&self) -> Mat4 {
        let position = if self.tag != 0 {
            self.local_position()
        } else {
            Vec3::ZERO
        };

        math::offset_matrix(position, Vec4::from(self.local_rotation()), Vec3::ONE)
    }
}

impl Bone for SkeletonNode {
    fn local_position(&self) -> Vec3 {
        if self.has_position() {
            self.position
        } else {
            Vec3::ZERO
        }
    }

    fn local_rotation(&self) -> Quat {
        if self.has_rotation() {
            self.rotation
        } else {
            Quat::IDENTITY
        }
    }

    fn local_scale(&self) -> Vec3 {
        if self.has_scale() {
            self.scale
        } else {
            Vec3::ONE
        }
    }

    fn tag(&self) -> i32 {
        self.tag
    }
}
