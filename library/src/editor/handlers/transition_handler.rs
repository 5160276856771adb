use crate::editor::handlers::{editable_track, ensure_unused, owning_track};
use crate::error::{EditError, OperationError, ValidationError};
use crate::model::ids::TransitionId;
use crate::model::time::Time;
use crate::model::timeline::Timeline;
use crate::model::transition::{Boundary, Transition, TransitionKind};

pub struct TransitionHandler;

impl TransitionHandler {
    /// Creates or replaces the transition at `boundary`.
    ///
    /// A duration longer than the boundary allows is clamped to the shorter adjacent clip
    /// rather than rejected. Reusing `transition_id` updates that transition in place.
    pub fn set_transition(
        timeline: &mut Timeline,
        transition_id: TransitionId,
        boundary: Boundary,
        kind: TransitionKind,
        duration: Time,
    ) -> Result<(), EditError> {
        if !duration.is_positive() {
            return Err(OperationError::InvalidDuration(duration).into());
        }
        let track_id = match boundary {
            Boundary::Cut { left, right } => {
                let track_id = owning_track(timeline, left)?;
                if owning_track(timeline, right)? != track_id {
                    return Err(ValidationError::InvalidBoundary.into());
                }
                track_id
            }
            Boundary::In { clip } | Boundary::Out { clip } => owning_track(timeline, clip)?,
        };
        match timeline.transition(transition_id) {
            Some((track, _)) if track.id != track_id => {
                return Err(ValidationError::DuplicateId(transition_id.to_string()).into());
            }
            Some(_) => {}
            None => ensure_unused(timeline, transition_id.as_uuid())?,
        }

        let track = editable_track(timeline, track_id)?;
        let (_, max) = track
            .boundary_extent(&boundary)
            .ok_or(ValidationError::InvalidBoundary)?;
        let clamped = duration.min(max);
        if clamped < duration {
            log::debug!(
                "Clamped {} transition {} from {} to {}",
                kind.type_tag(),
                transition_id,
                duration,
                clamped
            );
        }
        track
            .transitions
            .retain(|t| t.id != transition_id && t.boundary != boundary);
        track.transitions.push(Transition {
            id: transition_id,
            boundary,
            kind,
            duration: clamped,
        });
        Ok(())
    }

    pub fn remove_transition(timeline: &mut Timeline, transition_id: TransitionId) -> Result<(), EditError> {
        let track_id = timeline
            .transition(transition_id)
            .map(|(track, _)| track.id)
            .ok_or(ValidationError::TransitionNotFound(transition_id))?;
        editable_track(timeline, track_id)?
            .transitions
            .retain(|t| t.id != transition_id);
        Ok(())
    }
}
