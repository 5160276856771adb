//! Mutation operations and their structural inverses.
//!
//! [`apply`] is a pure function: it never touches the timeline it is given, it returns a
//! new validated timeline plus the [`InverseOperation`] that restores the old one. Because
//! tracks are shared behind `Arc`, the new timeline only owns copies of the tracks the
//! operation changed, and the inverse only holds the before-images of those tracks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::editor::handlers::{ClipHandler, EffectHandler, TrackHandler, TransitionHandler};
use crate::error::{EditError, HistoryError, OperationError};
use crate::model::clip::{self, Clip, MediaRef};
use crate::model::effect::Effect;
use crate::model::ids::{ClipId, TrackId, TransitionId};
use crate::model::time::{Time, TimeRange};
use crate::model::timeline::{Timeline, TimelineSettings};
use crate::model::track::{Track, TrackKind};
use crate::model::transition::{Boundary, TransitionKind};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    LeaveGap,
    Ripple,
}

/// Parameters for placing a new clip.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct NewClip {
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub media: MediaRef,
    pub position: Time,
    /// Source window to show; the whole media when absent.
    #[serde(default)]
    pub source_range: Option<TimeRange>,
    #[serde(default = "unit")]
    pub speed: f64,
    #[serde(default = "unit")]
    pub volume: f64,
}

fn unit() -> f64 {
    1.0
}

impl NewClip {
    pub fn new(clip_id: ClipId, track_id: TrackId, media: MediaRef, position: Time) -> Self {
        Self {
            clip_id,
            track_id,
            media,
            position,
            source_range: None,
            speed: 1.0,
            volume: 1.0,
        }
    }

    pub fn with_source_range(mut self, range: TimeRange) -> Self {
        self.source_range = Some(range);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub(crate) fn build(&self) -> Result<Clip, EditError> {
        clip::check_speed(self.speed)?;
        clip::check_gain(self.volume)?;
        let source = self
            .source_range
            .unwrap_or(TimeRange::new(Time::ZERO, self.media.source_duration));
        let clip = Clip {
            id: self.clip_id,
            track_id: self.track_id,
            media: self.media,
            position: self.position,
            duration: clip::duration_for(source.start, source.end, self.speed),
            trim_in: source.start,
            trim_out: source.end,
            effects: Vec::new(),
            volume: self.volume,
            speed: self.speed,
        };
        clip.validate()?;
        Ok(clip)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddTrack {
        track_id: TrackId,
        kind: TrackKind,
        name: String,
        /// Layer index; appended on top when absent.
        #[serde(default)]
        index: Option<usize>,
    },
    DeleteTrack {
        track_id: TrackId,
    },
    MuteTrack {
        track_id: TrackId,
        muted: bool,
    },
    LockTrack {
        track_id: TrackId,
        locked: bool,
    },
    SetTrackGain {
        track_id: TrackId,
        gain: f64,
    },
    /// Rejects with `Overlap` when the interval is taken.
    AddClip(NewClip),
    /// Push-aside variant of `AddClip`: later clips shift right to make room.
    InsertClip(NewClip),
    MoveClip {
        clip_id: ClipId,
        position: Time,
        #[serde(default)]
        track_id: Option<TrackId>,
    },
    SplitClip {
        clip_id: ClipId,
        at: Time,
        new_clip_id: ClipId,
    },
    TrimClip {
        clip_id: ClipId,
        trim_in: Time,
        trim_out: Time,
    },
    DeleteClip {
        clip_id: ClipId,
        gap: GapPolicy,
    },
    SetClipVolume {
        clip_id: ClipId,
        volume: f64,
    },
    SetClipSpeed {
        clip_id: ClipId,
        speed: f64,
    },
    StackEffect {
        clip_id: ClipId,
        index: usize,
        effect: Effect,
    },
    RemoveEffect {
        clip_id: ClipId,
        index: usize,
    },
    ReorderEffect {
        clip_id: ClipId,
        from: usize,
        to: usize,
    },
    SetTransition {
        transition_id: TransitionId,
        boundary: Boundary,
        kind: TransitionKind,
        duration: Time,
    },
    RemoveTransition {
        transition_id: TransitionId,
    },
    UpdateSettings {
        settings: TimelineSettings,
    },
    /// Applied atomically and recorded as a single history entry.
    Batch {
        label: String,
        operations: Vec<Operation>,
    },
}

impl Operation {
    /// Short human-readable description for history menus.
    pub fn label(&self) -> String {
        match self {
            Operation::AddTrack { name, .. } => format!("Add Track '{}'", name),
            Operation::DeleteTrack { .. } => "Delete Track".to_string(),
            Operation::MuteTrack { muted: true, .. } => "Mute Track".to_string(),
            Operation::MuteTrack { muted: false, .. } => "Unmute Track".to_string(),
            Operation::LockTrack { locked: true, .. } => "Lock Track".to_string(),
            Operation::LockTrack { locked: false, .. } => "Unlock Track".to_string(),
            Operation::SetTrackGain { .. } => "Set Track Gain".to_string(),
            Operation::AddClip(_) => "Add Clip".to_string(),
            Operation::InsertClip(_) => "Insert Clip".to_string(),
            Operation::MoveClip { .. } => "Move Clip".to_string(),
            Operation::SplitClip { .. } => "Split Clip".to_string(),
            Operation::TrimClip { .. } => "Trim Clip".to_string(),
            Operation::DeleteClip {
                gap: GapPolicy::Ripple,
                ..
            } => "Ripple Delete".to_string(),
            Operation::DeleteClip { .. } => "Delete Clip".to_string(),
            Operation::SetClipVolume { .. } => "Set Clip Volume".to_string(),
            Operation::SetClipSpeed { .. } => "Set Clip Speed".to_string(),
            Operation::StackEffect { effect, .. } => {
                format!("Add Effect '{}'", effect.kind.type_tag())
            }
            Operation::RemoveEffect { .. } => "Remove Effect".to_string(),
            Operation::ReorderEffect { .. } => "Reorder Effects".to_string(),
            Operation::SetTransition { kind, .. } => {
                format!("Set Transition '{}'", kind.type_tag())
            }
            Operation::RemoveTransition { .. } => "Remove Transition".to_string(),
            Operation::UpdateSettings { .. } => "Timeline Settings".to_string(),
            Operation::Batch { label, .. } => label.clone(),
        }
    }
}

/// Applies `operation` to a copy of `timeline`.
///
/// On success returns the new timeline and the inverse that turns it back into
/// `timeline`. On failure `timeline` is untouched and nothing is returned.
pub fn apply(
    timeline: &Timeline,
    operation: &Operation,
) -> Result<(Timeline, InverseOperation), EditError> {
    let mut next = timeline.clone();
    apply_in_place(&mut next, operation)?;
    finalize(timeline, &mut next)?;
    let inverse = InverseOperation::capture(timeline, &next);
    Ok((next, inverse))
}

fn apply_in_place(timeline: &mut Timeline, operation: &Operation) -> Result<(), EditError> {
    match operation {
        Operation::AddTrack {
            track_id,
            kind,
            name,
            index,
        } => TrackHandler::add_track(timeline, *track_id, *kind, name, *index),
        Operation::DeleteTrack { track_id } => TrackHandler::delete_track(timeline, *track_id),
        Operation::MuteTrack { track_id, muted } => {
            TrackHandler::set_muted(timeline, *track_id, *muted)
        }
        Operation::LockTrack { track_id, locked } => {
            TrackHandler::set_locked(timeline, *track_id, *locked)
        }
        Operation::SetTrackGain { track_id, gain } => {
            TrackHandler::set_gain(timeline, *track_id, *gain)
        }
        Operation::AddClip(spec) => ClipHandler::add_clip(timeline, spec),
        Operation::InsertClip(spec) => ClipHandler::insert_clip(timeline, spec),
        Operation::MoveClip {
            clip_id,
            position,
            track_id,
        } => ClipHandler::move_clip(timeline, *clip_id, *position, *track_id),
        Operation::SplitClip {
            clip_id,
            at,
            new_clip_id,
        } => ClipHandler::split_clip(timeline, *clip_id, *at, *new_clip_id),
        Operation::TrimClip {
            clip_id,
            trim_in,
            trim_out,
        } => ClipHandler::trim_clip(timeline, *clip_id, *trim_in, *trim_out),
        Operation::DeleteClip { clip_id, gap } => {
            ClipHandler::delete_clip(timeline, *clip_id, *gap)
        }
        Operation::SetClipVolume { clip_id, volume } => {
            ClipHandler::set_volume(timeline, *clip_id, *volume)
        }
        Operation::SetClipSpeed { clip_id, speed } => {
            ClipHandler::set_speed(timeline, *clip_id, *speed)
        }
        Operation::StackEffect {
            clip_id,
            index,
            effect,
        } => EffectHandler::stack_effect(timeline, *clip_id, *index, effect.clone()),
        Operation::RemoveEffect { clip_id, index } => {
            EffectHandler::remove_effect(timeline, *clip_id, *index)
        }
        Operation::ReorderEffect { clip_id, from, to } => {
            EffectHandler::reorder_effect(timeline, *clip_id, *from, *to)
        }
        Operation::SetTransition {
            transition_id,
            boundary,
            kind,
            duration,
        } => TransitionHandler::set_transition(
            timeline,
            *transition_id,
            *boundary,
            *kind,
            *duration,
        ),
        Operation::RemoveTransition { transition_id } => {
            TransitionHandler::remove_transition(timeline, *transition_id)
        }
        Operation::UpdateSettings { settings } => {
            settings.validate()?;
            timeline.set_settings(*settings);
            Ok(())
        }
        Operation::Batch { label, operations } => {
            if operations.is_empty() {
                return Err(OperationError::EmptyBatch(label.clone()).into());
            }
            operations
                .iter()
                .try_for_each(|op| apply_in_place(timeline, op))
        }
    }
}

/// Re-clamps transitions and validates every track the operation touched.
fn finalize(before: &Timeline, next: &mut Timeline) -> Result<(), EditError> {
    for shared in next.shared_tracks_mut().iter_mut() {
        let unchanged = before
            .shared_tracks()
            .iter()
            .any(|old| Arc::ptr_eq(old, shared));
        if unchanged {
            continue;
        }
        let track = Arc::make_mut(shared);
        track.reconcile_transitions();
        track.validate()?;
    }
    Ok(())
}

/// Structural diff that restores a previous timeline.
///
/// Holds the before-image of every track that changed (or was removed), the previous
/// track order and, if they changed, the previous settings. Tracks the operation left
/// alone are taken from whatever timeline the inverse is applied to.
#[derive(Clone, PartialEq, Debug)]
pub struct InverseOperation {
    order: Vec<TrackId>,
    tracks: Vec<Arc<Track>>,
    settings: Option<TimelineSettings>,
}

impl InverseOperation {
    pub fn capture(before: &Timeline, after: &Timeline) -> Self {
        let tracks = before
            .shared_tracks()
            .iter()
            .filter(|old| {
                !after
                    .shared_tracks()
                    .iter()
                    .any(|new| Arc::ptr_eq(old, new))
            })
            .cloned()
            .collect();
        let settings = (before.settings() != after.settings()).then(|| *before.settings());
        Self {
            order: before.tracks().map(|t| t.id).collect(),
            tracks,
            settings,
        }
    }

    /// Number of track before-images held.
    pub fn changed_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn apply(&self, current: &Timeline) -> Result<Timeline, HistoryError> {
        let mut restored = Vec::with_capacity(self.order.len());
        for track_id in &self.order {
            let track = self
                .tracks
                .iter()
                .find(|t| t.id == *track_id)
                .or_else(|| current.shared_tracks().iter().find(|t| t.id == *track_id))
                .ok_or_else(|| HistoryError::Corrupted(format!("{} is missing", track_id)))?;
            restored.push(Arc::clone(track));
        }
        let mut next = current.clone();
        *next.shared_tracks_mut() = restored;
        if let Some(settings) = self.settings {
            next.set_settings(settings);
        }
        next.validate()
            .map_err(|err| HistoryError::Corrupted(err.to_string()))?;
        Ok(next)
    }
}
