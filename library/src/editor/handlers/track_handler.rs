use std::sync::Arc;

use crate::editor::handlers::ensure_unused;
use crate::error::{EditError, ValidationError};
use crate::model::clip;
use crate::model::ids::TrackId;
use crate::model::timeline::Timeline;
use crate::model::track::{Track, TrackKind};

pub struct TrackHandler;

impl TrackHandler {
    /// Adds an empty track at `index` (top of the stack when absent).
    pub fn add_track(
        timeline: &mut Timeline,
        track_id: TrackId,
        kind: TrackKind,
        name: &str,
        index: Option<usize>,
    ) -> Result<(), EditError> {
        ensure_unused(timeline, track_id.as_uuid())?;
        let len = timeline.track_count();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(ValidationError::IndexOutOfRange { index, len }.into());
        }
        timeline
            .shared_tracks_mut()
            .insert(index, Arc::new(Track::new(track_id, kind, name)));
        log::debug!("Added {} track {} at layer {}", kind, track_id, index);
        Ok(())
    }

    /// Removes a track with all its clips and transitions. Locked tracks are kept.
    pub fn delete_track(timeline: &mut Timeline, track_id: TrackId) -> Result<(), EditError> {
        let index = timeline
            .track_index(track_id)
            .ok_or(ValidationError::TrackNotFound(track_id))?;
        if timeline.shared_tracks()[index].locked {
            return Err(ValidationError::TrackLocked(track_id).into());
        }
        timeline.shared_tracks_mut().remove(index);
        Ok(())
    }

    // Track-level toggles target the lane itself, so they work on locked tracks too.

    pub fn set_muted(timeline: &mut Timeline, track_id: TrackId, muted: bool) -> Result<(), EditError> {
        track_mut(timeline, track_id)?.muted = muted;
        Ok(())
    }

    pub fn set_locked(
        timeline: &mut Timeline,
        track_id: TrackId,
        locked: bool,
    ) -> Result<(), EditError> {
        track_mut(timeline, track_id)?.locked = locked;
        Ok(())
    }

    pub fn set_gain(timeline: &mut Timeline, track_id: TrackId, gain: f64) -> Result<(), EditError> {
        clip::check_gain(gain)?;
        track_mut(timeline, track_id)?.gain = gain;
        Ok(())
    }
}

fn track_mut(timeline: &mut Timeline, track_id: TrackId) -> Result<&mut Track, ValidationError> {
    timeline
        .track_mut(track_id)
        .ok_or(ValidationError::TrackNotFound(track_id))
}
