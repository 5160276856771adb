use crate::editor::handlers::{editable_track, ensure_unused, owning_track};
use crate::editor::operation::{GapPolicy, NewClip};
use crate::error::{EditError, ValidationError};
use crate::model::clip::{self, Clip};
use crate::model::ids::{ClipId, TrackId};
use crate::model::time::Time;
use crate::model::timeline::Timeline;
use crate::model::transition::Boundary;

pub struct ClipHandler;

impl ClipHandler {
    /// Places a new clip; the target interval must be free.
    pub fn add_clip(timeline: &mut Timeline, spec: &NewClip) -> Result<(), EditError> {
        let clip = Self::prepare(timeline, spec)?;
        let track = editable_track(timeline, spec.track_id)?;
        track.check_free(clip.range(), None)?;
        log::debug!("Adding clip {} to track {} at {}", clip.id, track.id, clip.range());
        track.insert_sorted(clip);
        Ok(())
    }

    /// Places a new clip, shifting every clip at or after its position right by the
    /// amount needed to make room. Fails if the position falls inside an existing clip.
    pub fn insert_clip(timeline: &mut Timeline, spec: &NewClip) -> Result<(), EditError> {
        let clip = Self::prepare(timeline, spec)?;
        let track = editable_track(timeline, spec.track_id)?;
        let at = clip.position;
        if let Some(straddler) = track.clips.iter().find(|c| c.position < at && at < c.end()) {
            return Err(ValidationError::Overlap {
                track_id: track.id,
                range: clip.range(),
                conflicting: straddler.id,
            }
            .into());
        }
        let shift = track
            .clips
            .iter()
            .find(|c| c.position >= at)
            .map(|next| clip.end() - next.position)
            .filter(|shift| shift.is_positive());
        if let Some(shift) = shift {
            log::debug!("Insert at {} pushes later clips by {}", at, shift);
            for later in track.clips.iter_mut().filter(|c| c.position >= at) {
                later.position += shift;
            }
        }
        track.insert_sorted(clip);
        Ok(())
    }

    fn prepare(timeline: &Timeline, spec: &NewClip) -> Result<Clip, EditError> {
        let track = timeline
            .track(spec.track_id)
            .ok_or(ValidationError::TrackNotFound(spec.track_id))?;
        if track.locked {
            return Err(ValidationError::TrackLocked(track.id).into());
        }
        if spec.position.is_negative() {
            return Err(ValidationError::InvalidPosition(spec.position).into());
        }
        ensure_unused(timeline, spec.clip_id.as_uuid())?;
        spec.build()
    }

    /// Moves a clip to `position`, optionally onto another track of the same kind.
    pub fn move_clip(
        timeline: &mut Timeline,
        clip_id: ClipId,
        position: Time,
        target: Option<TrackId>,
    ) -> Result<(), EditError> {
        if position.is_negative() {
            return Err(ValidationError::InvalidPosition(position).into());
        }
        let source_id = owning_track(timeline, clip_id)?;
        let target_id = target.unwrap_or(source_id);
        let moved = {
            let source = timeline
                .track(source_id)
                .ok_or(ValidationError::TrackNotFound(source_id))?;
            let destination = timeline
                .track(target_id)
                .ok_or(ValidationError::TrackNotFound(target_id))?;
            for track in [source, destination] {
                if track.locked {
                    return Err(ValidationError::TrackLocked(track.id).into());
                }
            }
            if destination.kind != source.kind {
                return Err(ValidationError::TrackKindMismatch {
                    track_id: target_id,
                    expected: source.kind,
                    found: destination.kind,
                }
                .into());
            }
            let mut moved = source
                .clip(clip_id)
                .cloned()
                .ok_or(ValidationError::ClipNotFound(clip_id))?;
            moved.position = position;
            moved.track_id = target_id;
            destination.check_free(moved.range(), Some(clip_id))?;
            moved
        };
        editable_track(timeline, source_id)?.remove_clip(clip_id);
        editable_track(timeline, target_id)?.insert_sorted(moved);
        Ok(())
    }

    /// Cuts a clip in two at timeline time `at`.
    ///
    /// The left half keeps the original id, effects and leading transitions. The right
    /// half takes `new_clip_id`, starts with no effects and inherits the transitions on
    /// the original's trailing edge.
    pub fn split_clip(
        timeline: &mut Timeline,
        clip_id: ClipId,
        at: Time,
        new_clip_id: ClipId,
    ) -> Result<(), EditError> {
        let track_id = owning_track(timeline, clip_id)?;
        ensure_unused(timeline, new_clip_id.as_uuid())?;
        let track = editable_track(timeline, track_id)?;
        let left = track
            .clip_mut(clip_id)
            .ok_or(ValidationError::ClipNotFound(clip_id))?;
        if !(left.position < at && at < left.end()) {
            return Err(ValidationError::PositionOutOfRange { clip_id, at }.into());
        }
        let offset = at - left.position;
        let source_cut = left.trim_in + offset.scale(left.speed);
        let right = Clip {
            id: new_clip_id,
            position: at,
            duration: left.duration - offset,
            trim_in: source_cut,
            effects: Vec::new(),
            ..left.clone()
        };
        left.duration = offset;
        left.trim_out = source_cut;
        left.validate()?;
        right.validate()?;

        for transition in track.transitions.iter_mut() {
            let trailing = match transition.boundary {
                Boundary::Out { clip } => clip == clip_id,
                Boundary::Cut { left: outgoing, .. } => outgoing == clip_id,
                Boundary::In { .. } => false,
            };
            if trailing {
                transition.boundary.rebind(clip_id, new_clip_id);
            }
        }
        log::debug!("Split clip {} at {} (new right half {})", clip_id, at, new_clip_id);
        track.insert_sorted(right);
        Ok(())
    }

    /// Changes the source window. Position stays put; the end moves with the new duration.
    pub fn trim_clip(
        timeline: &mut Timeline,
        clip_id: ClipId,
        trim_in: Time,
        trim_out: Time,
    ) -> Result<(), EditError> {
        Self::reshape(timeline, clip_id, |clip| {
            clip.trim_in = trim_in;
            clip.trim_out = trim_out;
        })
    }

    pub fn set_speed(timeline: &mut Timeline, clip_id: ClipId, speed: f64) -> Result<(), EditError> {
        clip::check_speed(speed)?;
        Self::reshape(timeline, clip_id, |clip| clip.speed = speed)
    }

    /// Applies a change that can alter the clip's duration, then re-checks the clip and
    /// its neighbours.
    fn reshape(
        timeline: &mut Timeline,
        clip_id: ClipId,
        change: impl FnOnce(&mut Clip),
    ) -> Result<(), EditError> {
        let track_id = owning_track(timeline, clip_id)?;
        let track = editable_track(timeline, track_id)?;
        let mut reshaped = track
            .clip(clip_id)
            .cloned()
            .ok_or(ValidationError::ClipNotFound(clip_id))?;
        change(&mut reshaped);
        reshaped.duration = clip::duration_for(reshaped.trim_in, reshaped.trim_out, reshaped.speed);
        reshaped.validate()?;
        track.check_free(reshaped.range(), Some(clip_id))?;
        if let Some(slot) = track.clip_mut(clip_id) {
            *slot = reshaped;
        }
        Ok(())
    }

    pub fn delete_clip(timeline: &mut Timeline, clip_id: ClipId, gap: GapPolicy) -> Result<(), EditError> {
        let track_id = owning_track(timeline, clip_id)?;
        let track = editable_track(timeline, track_id)?;
        let removed = track
            .remove_clip(clip_id)
            .ok_or(ValidationError::ClipNotFound(clip_id))?;
        if gap == GapPolicy::Ripple {
            for later in track.clips.iter_mut().filter(|c| c.position >= removed.end()) {
                later.position -= removed.duration;
            }
            log::debug!(
                "Ripple delete of {} shifted later clips by {}",
                clip_id,
                removed.duration
            );
        }
        Ok(())
    }

    pub fn set_volume(timeline: &mut Timeline, clip_id: ClipId, volume: f64) -> Result<(), EditError> {
        clip::check_gain(volume)?;
        let track_id = owning_track(timeline, clip_id)?;
        let clip = editable_track(timeline, track_id)?
            .clip_mut(clip_id)
            .ok_or(ValidationError::ClipNotFound(clip_id))?;
        clip.volume = volume;
        Ok(())
    }
}
