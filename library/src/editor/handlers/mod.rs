pub mod clip_handler;
pub mod effect_handler;
pub mod track_handler;
pub mod transition_handler;

pub use clip_handler::ClipHandler;
pub use effect_handler::EffectHandler;
pub use track_handler::TrackHandler;
pub use transition_handler::TransitionHandler;

use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::ids::{ClipId, TrackId};
use crate::model::timeline::Timeline;
use crate::model::track::Track;

/// Track that owns `clip_id`.
pub(crate) fn owning_track(timeline: &Timeline, clip_id: ClipId) -> Result<TrackId, ValidationError> {
    timeline
        .clip_track(clip_id)
        .map(|track| track.id)
        .ok_or(ValidationError::ClipNotFound(clip_id))
}

/// Write access to a track that exists and is not locked.
///
/// The lock is checked before the copy-on-write clone so rejected edits never
/// duplicate a shared track.
pub(crate) fn editable_track(
    timeline: &mut Timeline,
    track_id: TrackId,
) -> Result<&mut Track, ValidationError> {
    match timeline.track(track_id) {
        None => return Err(ValidationError::TrackNotFound(track_id)),
        Some(track) if track.locked => return Err(ValidationError::TrackLocked(track_id)),
        Some(_) => {}
    }
    timeline
        .track_mut(track_id)
        .ok_or(ValidationError::TrackNotFound(track_id))
}

pub(crate) fn ensure_unused(timeline: &Timeline, uuid: &Uuid) -> Result<(), ValidationError> {
    if timeline.contains_id(uuid) {
        Err(ValidationError::DuplicateId(uuid.to_string()))
    } else {
        Ok(())
    }
}
