//! Pose of a single bone at an evaluated tick

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::error::{Result, TrackError};
use crate::key::ChannelValue;
use crate::math;
use crate::node::Bone;
use crate::track::Track;

/// Position, rotation and scale of one bone.
///
/// Meant to be reused between frames: [`AnimationState::reset`] followed by
/// [`AnimationState::evaluate`] allocates nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationState {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the rest pose of a bone.
    ///
    /// Scale is always reset to one. The rest position is only used when the
    /// bone's tag is non-zero.
    pub fn reset<B: Bone + ?Sized>(&mut self, bone: &B) {
        self.scale = Vec3::ONE;
        self.rotation = bone.local_rotation();
        self.position = if bone.tag() != 0 {
            bone.local_position()
        } else {
            Vec3::ZERO
        };
    }

    /// Rotation and translation of this pose, followed by its scale if it is not one
    pub fn local_offset_matrix(&self) -> Mat4 {
        math::offset_matrix(self.position, Vec4::from(self.rotation), self.scale)
    }

    /// Write a key's contribution into the matching channel
    pub fn apply(&mut self, value: ChannelValue) {
        match value {
            ChannelValue::Position(position) => self.position = position,
            ChannelValue::Rotation(rotation) => self.rotation = Quat::from_vec4(rotation),
            ChannelValue::Scale(scale) => self.scale = scale,
        }
    }

    /// Evaluate every track at `tick`, writing the results into this pose.
    ///
    /// Returns whether any track still has animation left in the playback
    /// direction. Tracks without a key covering `tick` are skipped.
    pub fn evaluate<'a, B, I>(
        &mut self,
        bone: &B,
        tick: f64,
        tracks: I,
        reverse_animation: bool,
    ) -> Result<bool>
    where
        B: Bone + ?Sized,
        I: IntoIterator<Item = &'a Track>,
    {
        if !tick.is_finite() {
            return Err(TrackError::InvalidTick(tick));
        }

        // Saturates outside the i32 range.
        let lookup_tick = tick.floor() as i32;
        let mut still_animating = false;

        for track in tracks {
            let Some(index) = track.key_index_for_tick(lookup_tick) else {
                continue;
            };

            let key = &track.keys[index];
            let last_key = index.checked_sub(1).map(|i| &track.keys[i]);
            let next_key = track.keys.get(index + 1);

            if tick < f64::from(key.tick) && last_key.is_none() {
                self.apply(key.interpolate(bone, None, 0.0));
                if !reverse_animation {
                    still_animating = true;
                }
            } else if let Some(next_key) = next_key {
                // Key ticks can be a full i32 range apart.
                let t = (tick - f64::from(key.tick))
                    / (f64::from(next_key.tick) - f64::from(key.tick));
                self.apply(next_key.interpolate(bone, Some(key), t as f32));
                still_animating = true;
            } else {
                self.apply(key.interpolate(bone, last_key, 1.0));
                if reverse_animation {
                    still_animating = true;
                }
            }
        }

        Ok(still_animating)
    }
}
