use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::model::clip::Clip;
use crate::model::ids::{ClipId, TrackId};
use crate::model::time::{Time, TimeRange};
use crate::model::transition::{Boundary, Transition};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
            TrackKind::Subtitle => "subtitle",
        };
        write!(f, "{}", s)
    }
}

/// An ordered, non-overlapping lane of clips of one kind.
///
/// `clips` is kept sorted by position; every mutation goes through the editor handlers,
/// which re-validate the lane before a new timeline is published.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_gain")]
    pub gain: f64,
}

fn default_gain() -> f64 {
    1.0
}

impl Track {
    pub fn new(id: TrackId, kind: TrackKind, name: &str) -> Self {
        Self {
            id,
            kind,
            name: name.to_string(),
            clips: Vec::new(),
            transitions: Vec::new(),
            muted: false,
            locked: false,
            gain: 1.0,
        }
    }

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn clip_index(&self, clip_id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == clip_id)
    }

    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    /// Clip covering `time`, if any.
    pub fn clip_at(&self, time: Time) -> Option<&Clip> {
        let idx = self.clips.partition_point(|c| c.end() <= time);
        self.clips.get(idx).filter(|c| c.range().contains(time))
    }

    pub fn end(&self) -> Time {
        self.clips.last().map(Clip::end).unwrap_or(Time::ZERO)
    }

    /// Fails with `Overlap` if `range` intersects any clip other than `exclude`.
    pub fn check_free(&self, range: TimeRange, exclude: Option<ClipId>) -> Result<(), ValidationError> {
        match self
            .clips
            .iter()
            .filter(|c| Some(c.id) != exclude)
            .find(|c| c.range().overlaps(&range))
        {
            Some(conflict) => Err(ValidationError::Overlap {
                track_id: self.id,
                range,
                conflicting: conflict.id,
            }),
            None => Ok(()),
        }
    }

    /// Inserts keeping position order. Callers check for overlap first.
    pub fn insert_sorted(&mut self, clip: Clip) {
        let idx = self.clips.partition_point(|c| c.position <= clip.position);
        self.clips.insert(idx, clip);
    }

    pub fn remove_clip(&mut self, clip_id: ClipId) -> Option<Clip> {
        let idx = self.clip_index(clip_id)?;
        Some(self.clips.remove(idx))
    }

    /// Gaps between clips inside `within`, ignoring `exclude`.
    pub fn free_intervals(&self, within: TimeRange, exclude: Option<ClipId>) -> Vec<TimeRange> {
        let mut gaps = Vec::new();
        let mut cursor = within.start;
        for clip in self.clips.iter().filter(|c| Some(c.id) != exclude) {
            if clip.end() <= cursor {
                continue;
            }
            if clip.position >= within.end {
                break;
            }
            if clip.position > cursor {
                gaps.push(TimeRange::new(cursor, clip.position));
            }
            cursor = cursor.max(clip.end());
        }
        if cursor < within.end {
            gaps.push(TimeRange::new(cursor, within.end));
        }
        gaps
    }

    /// Start position closest to `desired` where `duration` fits without overlap.
    pub fn nearest_free_slot(&self, desired: Time, duration: Time, exclude: Option<ClipId>) -> Time {
        let desired = desired.max(Time::ZERO);
        let horizon = TimeRange::new(Time::ZERO, Time::MAX);
        self.free_intervals(horizon, exclude)
            .into_iter()
            .filter(|gap| gap.duration() >= duration)
            .map(|gap| {
                let latest_start = gap.end - duration;
                desired.clamp(gap.start, latest_start)
            })
            .min_by_key(|start| ((*start - desired).as_micros().abs(), *start))
            .unwrap_or(desired)
    }

    pub fn transitions_for(&self, clip_id: ClipId) -> impl Iterator<Item = &Transition> {
        self.transitions
            .iter()
            .filter(move |t| t.boundary.involves(clip_id))
    }

    /// Edit point of a boundary and the longest transition it can hold, if the boundary
    /// is currently valid on this track.
    pub fn boundary_extent(&self, boundary: &Boundary) -> Option<(Time, Time)> {
        match *boundary {
            Boundary::Cut { left, right } => {
                let (l, r) = (self.clip(left)?, self.clip(right)?);
                (l.end() == r.position).then(|| (r.position, l.duration.min(r.duration)))
            }
            Boundary::In { clip } => {
                let c = self.clip(clip)?;
                let touched = self.clips.iter().any(|o| o.end() == c.position && o.id != c.id);
                (!touched).then_some((c.position, c.duration))
            }
            Boundary::Out { clip } => {
                let c = self.clip(clip)?;
                let touched = self.clips.iter().any(|o| o.position == c.end() && o.id != c.id);
                (!touched).then_some((c.end(), c.duration))
            }
        }
    }

    /// Drops transitions whose boundary no longer exists and clamps the rest.
    pub fn reconcile_transitions(&mut self) {
        let mut kept = Vec::with_capacity(self.transitions.len());
        for mut transition in std::mem::take(&mut self.transitions) {
            match self.boundary_extent(&transition.boundary) {
                Some((_, max)) => {
                    transition.duration = transition.duration.min(max);
                    kept.push(transition);
                }
                None => log::debug!(
                    "Dropping transition {} on track {}: boundary no longer valid",
                    transition.id,
                    self.id
                ),
            }
        }
        self.transitions = kept;
    }

    /// Full structural check of the lane.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for clip in &self.clips {
            if clip.track_id != self.id {
                return Err(ValidationError::InvalidClip {
                    clip_id: clip.id,
                    reason: format!("owned by {} but stored on {}", clip.track_id, self.id),
                });
            }
            clip.validate()?;
        }
        for pair in self.clips.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.position < a.end() {
                return Err(ValidationError::Overlap {
                    track_id: self.id,
                    range: b.range(),
                    conflicting: a.id,
                });
            }
        }
        for transition in &self.transitions {
            match self.boundary_extent(&transition.boundary) {
                Some((_, max)) if transition.duration.is_positive() && transition.duration <= max => {}
                _ => return Err(ValidationError::InvalidTransition(transition.id)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clip::MediaRef;
    use crate::model::ids::MediaId;

    fn clip(track: TrackId, start: i64, end: i64) -> Clip {
        Clip {
            id: ClipId::new_v4(),
            track_id: track,
            media: MediaRef::new(MediaId::new_v4(), Time::from_secs(100)),
            position: Time::from_secs(start),
            duration: Time::from_secs(end - start),
            trim_in: Time::ZERO,
            trim_out: Time::from_secs(end - start),
            effects: Vec::new(),
            volume: 1.0,
            speed: 1.0,
        }
    }

    #[test]
    fn free_intervals_report_gaps() {
        let mut track = Track::new(TrackId::new_v4(), TrackKind::Video, "V1");
        track.insert_sorted(clip(track.id, 2, 4));
        track.insert_sorted(clip(track.id, 6, 8));
        let gaps = track.free_intervals(TimeRange::new(Time::ZERO, Time::from_secs(10)), None);
        assert_eq!(
            gaps,
            vec![
                TimeRange::new(Time::ZERO, Time::from_secs(2)),
                TimeRange::new(Time::from_secs(4), Time::from_secs(6)),
                TimeRange::new(Time::from_secs(8), Time::from_secs(10)),
            ]
        );
    }

    #[test]
    fn nearest_free_slot_moves_to_closest_gap() {
        let mut track = Track::new(TrackId::new_v4(), TrackKind::Video, "V1");
        track.insert_sorted(clip(track.id, 0, 5));
        track.insert_sorted(clip(track.id, 7, 10));
        // 2s clip wanted at 4 fits in the [5, 7) gap.
        assert_eq!(
            track.nearest_free_slot(Time::from_secs(4), Time::from_secs(2), None),
            Time::from_secs(5)
        );
        // 3s clip does not fit the gap, falls after the last clip.
        assert_eq!(
            track.nearest_free_slot(Time::from_secs(4), Time::from_secs(3), None),
            Time::from_secs(10)
        );
    }

    #[test]
    fn clip_at_uses_half_open_ranges() {
        let mut track = Track::new(TrackId::new_v4(), TrackKind::Video, "V1");
        let a = clip(track.id, 0, 5);
        let b = clip(track.id, 5, 10);
        let (a_id, b_id) = (a.id, b.id);
        track.insert_sorted(a);
        track.insert_sorted(b);
        assert_eq!(track.clip_at(Time::from_secs(5)).map(|c| c.id), Some(b_id));
        assert_eq!(track.clip_at(Time::from_micros(4_999_999)).map(|c| c.id), Some(a_id));
        assert!(track.clip_at(Time::from_secs(10)).is_none());
    }
}
