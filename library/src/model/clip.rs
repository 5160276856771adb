use serde::{Deserialize, Serialize};

use crate::error::{OperationError, ValidationError};
use crate::model::effect::{Effect, EffectKind};
use crate::model::ids::{ClipId, MediaId, TrackId};
use crate::model::time::{Time, TimeRange};

/// Weak reference to an item of the external media library.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MediaRef {
    pub media_id: MediaId,
    pub source_duration: Time,
}

impl MediaRef {
    pub fn new(media_id: MediaId, source_duration: Time) -> Self {
        Self {
            media_id,
            source_duration,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub media: MediaRef,
    pub position: Time,
    pub duration: Time,
    pub trim_in: Time,
    pub trim_out: Time,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default = "default_unit")]
    pub volume: f64,
    #[serde(default = "default_unit")]
    pub speed: f64,
}

fn default_unit() -> f64 {
    1.0
}

/// Timeline duration of a source window played at `speed`.
pub fn duration_for(trim_in: Time, trim_out: Time, speed: f64) -> Time {
    (trim_out - trim_in).div_f64(speed)
}

/// Slowest and fastest playback rates a clip may use. Keeps every stretched duration
/// well inside the `Time` range.
pub const MIN_SPEED: f64 = 0.01;
pub const MAX_SPEED: f64 = 100.0;

pub(crate) fn check_speed(speed: f64) -> Result<(), OperationError> {
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(())
    } else {
        Err(OperationError::InvalidSpeed(speed))
    }
}

pub(crate) fn check_gain(gain: f64) -> Result<(), OperationError> {
    if gain.is_finite() && gain >= 0.0 {
        Ok(())
    } else {
        Err(OperationError::InvalidGain(gain))
    }
}

impl Clip {
    pub fn end(&self) -> Time {
        self.position + self.duration
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.position, self.end())
    }

    pub fn source_range(&self) -> TimeRange {
        TimeRange::new(self.trim_in, self.trim_out)
    }

    /// Source time shown at timeline time `t`, held at the trim edges outside the clip.
    pub fn source_time_at(&self, t: Time) -> Time {
        let offset = (t - self.position).scale(self.speed);
        (self.trim_in + offset).clamp_to(self.source_range())
    }

    pub fn effect_kinds(&self) -> impl Iterator<Item = &EffectKind> {
        self.effects.iter().map(|effect| &effect.kind)
    }

    /// Checks the trim window against the media and the stored duration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if check_speed(self.speed).is_err() || check_gain(self.volume).is_err() {
            return Err(ValidationError::InvalidClip {
                clip_id: self.id,
                reason: format!("speed {} / volume {}", self.speed, self.volume),
            });
        }
        if self.trim_in.is_negative()
            || self.trim_out > self.media.source_duration
            || self.trim_out <= self.trim_in
        {
            return Err(ValidationError::TrimOutOfRange {
                clip_id: self.id,
                trim_in: self.trim_in,
                trim_out: self.trim_out,
                source_duration: self.media.source_duration,
            });
        }
        if self.position.is_negative() {
            return Err(ValidationError::InvalidPosition(self.position));
        }
        for effect in &self.effects {
            effect.kind.validate().map_err(|err| ValidationError::InvalidClip {
                clip_id: self.id,
                reason: format!("effect {}: {}", effect.id, err),
            })?;
        }
        // Rounding at split points can drift by up to one source microsecond per edge.
        let tolerance = (1.0 / self.speed).ceil().min(i64::MAX as f64) as i64;
        let tolerance = tolerance.saturating_add(1);
        let expected = duration_for(self.trim_in, self.trim_out, self.speed);
        if !self.duration.is_positive()
            || (expected - self.duration).as_micros().abs() > tolerance
        {
            return Err(ValidationError::DurationMismatch {
                clip_id: self.id,
                duration: self.duration,
                expected,
            });
        }
        Ok(())
    }
}
