use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::clip::Clip;
use crate::model::ids::{ClipId, TrackId, TransitionId};
use crate::model::time::{Time, TimeRange};
use crate::model::track::Track;
use crate::model::transition::Transition;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimelineSettings {
    pub aspect_ratio: Rational,
    pub frame_rate: Rational,
    pub resolution: Resolution,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: Rational::new(16, 9),
            frame_rate: Rational::new(30, 1),
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
        }
    }
}

impl TimelineSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.aspect_ratio.is_valid()
            || !self.frame_rate.is_valid()
            || self.resolution.width == 0
            || self.resolution.height == 0
        {
            return Err(ValidationError::InvalidSettings);
        }
        Ok(())
    }
}

/// The edit: tracks in layer order (index 0 is the bottom layer) plus global settings.
///
/// Tracks are shared behind `Arc` so cloning a timeline for an edit only copies the
/// tracks that the edit actually touches.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Timeline {
    #[serde(default)]
    tracks: Vec<Arc<Track>>,
    #[serde(default)]
    playhead: Time,
    #[serde(default)]
    settings: TimelineSettings,
}

impl Timeline {
    pub fn new(settings: TimelineSettings) -> Self {
        Self {
            tracks: Vec::new(),
            playhead: Time::ZERO,
            settings,
        }
    }

    pub fn tracks(&self) -> impl ExactSizeIterator<Item = &Track> {
        self.tracks.iter().map(|t| t.as_ref())
    }

    pub(crate) fn shared_tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub(crate) fn shared_tracks_mut(&mut self) -> &mut Vec<Arc<Track>> {
        &mut self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id).map(|t| t.as_ref())
    }

    pub fn track_index(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Copy-on-write access to one track.
    pub(crate) fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .map(Arc::make_mut)
    }

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.tracks.iter().find_map(|t| t.clip(clip_id))
    }

    /// Track that owns `clip_id`.
    pub fn clip_track(&self, clip_id: ClipId) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.clip(clip_id).is_some())
            .map(|t| t.as_ref())
    }

    pub fn transition(&self, transition_id: TransitionId) -> Option<(&Track, &Transition)> {
        self.tracks.iter().find_map(|track| {
            track
                .transitions
                .iter()
                .find(|t| t.id == transition_id)
                .map(|t| (track.as_ref(), t))
        })
    }

    /// Transitions attached to either edge of `clip_id`.
    pub fn transitions_for(&self, clip_id: ClipId) -> impl Iterator<Item = &Transition> {
        self.clip_track(clip_id)
            .into_iter()
            .flat_map(move |track| track.transitions_for(clip_id))
    }

    /// End of the last clip across all tracks.
    pub fn duration(&self) -> Time {
        self.tracks
            .iter()
            .map(|t| t.end())
            .max()
            .unwrap_or(Time::ZERO)
    }

    /// Clip on `track_id` covering `time`, for hit-testing.
    pub fn clip_at(&self, track_id: TrackId, time: Time) -> Option<&Clip> {
        self.track(track_id)?.clip_at(time)
    }

    pub fn free_intervals(
        &self,
        track_id: TrackId,
        within: TimeRange,
    ) -> Result<Vec<TimeRange>, ValidationError> {
        let track = self
            .track(track_id)
            .ok_or(ValidationError::TrackNotFound(track_id))?;
        Ok(track.free_intervals(within, None))
    }

    /// Closest start to `desired` where a clip of `duration` fits on the track.
    ///
    /// Pass the moving clip as `exclude` so its current interval counts as free.
    pub fn nearest_free_slot(
        &self,
        track_id: TrackId,
        desired: Time,
        duration: Time,
        exclude: Option<ClipId>,
    ) -> Result<Time, ValidationError> {
        let track = self
            .track(track_id)
            .ok_or(ValidationError::TrackNotFound(track_id))?;
        Ok(track.nearest_free_slot(desired, duration, exclude))
    }

    pub fn playhead(&self) -> Time {
        self.playhead
    }

    pub fn with_playhead(&self, playhead: Time) -> Self {
        let mut next = self.clone();
        next.playhead = playhead.max(Time::ZERO);
        next
    }

    pub fn settings(&self) -> &TimelineSettings {
        &self.settings
    }

    pub(crate) fn set_settings(&mut self, settings: TimelineSettings) {
        self.settings = settings;
    }

    /// Whether any entity in the timeline already uses `uuid`.
    pub fn contains_id(&self, uuid: &Uuid) -> bool {
        self.tracks.iter().any(|track| {
            track.id.as_uuid() == uuid
                || track.transitions.iter().any(|t| t.id.as_uuid() == uuid)
                || track.clips.iter().any(|clip| {
                    clip.id.as_uuid() == uuid
                        || clip.effects.iter().any(|e| e.id.as_uuid() == uuid)
                })
        })
    }

    /// Checks every invariant. Used when accepting a document from outside.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.settings.validate()?;
        let mut seen = HashSet::new();
        for track in &self.tracks {
            track.validate()?;
            let ids = std::iter::once(*track.id.as_uuid())
                .chain(track.transitions.iter().map(|t| *t.id.as_uuid()))
                .chain(track.clips.iter().flat_map(|clip| {
                    std::iter::once(*clip.id.as_uuid())
                        .chain(clip.effects.iter().map(|e| *e.id.as_uuid()))
                }));
            for id in ids {
                if !seen.insert(id) {
                    return Err(ValidationError::DuplicateId(id.to_string()));
                }
            }
        }
        Ok(())
    }
}
