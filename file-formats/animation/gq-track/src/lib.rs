//! Keyframe animation tracks of Frogger: The Great Quest.
//!
//! Tracks hold the keys for one channel (position, rotation or scale) of one
//! bone. [`AnimationState::evaluate`] reproduces the game's curve evaluation
//! for a bone at a given tick, including its non-standard Bezier and TCB
//! formulas.
//!
//! ```
//! use gq_track::{AnimationState, ControlType, KeyValue, LinearKey, SkeletonNode, Track, TrackKey};
//! use glam::{Vec3, Vec4};
//!
//! let track = Track::with_keys(
//!     ControlType::LinearPosition,
//!     1,
//!     vec![
//!         TrackKey::new(0, KeyValue::LinearPosition(LinearKey::new(Vec4::W))),
//!         TrackKey::new(10, KeyValue::LinearPosition(LinearKey::new(Vec4::new(10.0, 0.0, 0.0, 1.0)))),
//!     ],
//! );
//!
//! let bone = SkeletonNode::new("root", 1);
//! let mut state = AnimationState::new();
//! state.reset(&bone);
//! let still_animating = state.evaluate(&bone, 5.0, [&track], false)?;
//!
//! assert!(still_animating);
//! assert_eq!(state.position, Vec3::new(5.0, 0.0, 0.0));
//! # Ok::<(), gq_track::TrackError>(())
//! ```

pub mod control_type;
pub mod error;
pub mod flags;
pub mod io_ext;
pub mod key;
pub mod math;
pub mod node;
pub mod state;
pub mod track;

pub use control_type::{Channel, ControlType};
pub use error::{Result, TrackError};
pub use key::{
    BezierFlags, BezierPositionKey, ChannelValue, KeyValue, LinearKey, TcbKey, TrackKey,
};
pub use node::{Bone, NodeFlags, SkeletonNode};
pub use state::AnimationState;
pub use track::{Track, TrackFlags, tracks_for_tag};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
