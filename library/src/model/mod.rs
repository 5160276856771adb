pub mod clip;
pub mod document;
pub mod effect;
pub mod ids;
pub mod time;
pub mod timeline;
pub mod track;
pub mod transition;

pub use clip::{Clip, MAX_SPEED, MIN_SPEED, MediaRef};
pub use document::{TIMELINE_SCHEMA_VERSION, TimelineDocument};
pub use effect::{Effect, EffectDescriptor, EffectKind, ParamValue};
pub use ids::{ClipId, EffectId, IdKind, IdRegistry, MediaId, TrackId, TransitionId};
pub use time::{Time, TimeRange};
pub use timeline::{Rational, Resolution, Timeline, TimelineSettings};
pub use track::{Track, TrackKind};
pub use transition::{Boundary, Transition, TransitionKind, WipeDirection};
