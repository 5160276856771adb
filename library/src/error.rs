use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ClipId, IdKind, MediaId, TrackId, TransitionId};
use crate::model::time::{Time, TimeRange};
use crate::model::track::TrackKind;

/// An edit was well-formed but would break a timeline invariant. State is unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("track {0} not found")]
    TrackNotFound(TrackId),
    #[error("clip {0} not found")]
    ClipNotFound(ClipId),
    #[error("transition {0} not found")]
    TransitionNotFound(TransitionId),
    #[error("invalid position {0}")]
    InvalidPosition(Time),
    #[error("{range} overlaps clip {conflicting} on track {track_id}")]
    Overlap {
        track_id: TrackId,
        range: TimeRange,
        conflicting: ClipId,
    },
    #[error("position {at} is not strictly inside clip {clip_id}")]
    PositionOutOfRange { clip_id: ClipId, at: Time },
    #[error("track {0} is locked")]
    TrackLocked(TrackId),
    #[error("track {track_id} holds {found} clips, expected {expected}")]
    TrackKindMismatch {
        track_id: TrackId,
        expected: TrackKind,
        found: TrackKind,
    },
    #[error("identifier {0} is already in use")]
    DuplicateId(String),
    #[error("trim [{trim_in}, {trim_out}) of clip {clip_id} is outside source media of length {source_duration}")]
    TrimOutOfRange {
        clip_id: ClipId,
        trim_in: Time,
        trim_out: Time,
        source_duration: Time,
    },
    #[error("clip {clip_id} duration {duration} does not match its trim window ({expected})")]
    DurationMismatch {
        clip_id: ClipId,
        duration: Time,
        expected: Time,
    },
    #[error("clip {clip_id} is invalid: {reason}")]
    InvalidClip { clip_id: ClipId, reason: String },
    #[error("boundary is not valid on this track")]
    InvalidBoundary,
    #[error("transition {0} does not fit its boundary")]
    InvalidTransition(TransitionId),
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid timeline settings")]
    InvalidSettings,
}

/// An edit request was malformed before it reached the timeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("unknown effect type '{0}'")]
    UnknownEffectType(String),
    #[error("unknown transition type '{0}'")]
    UnknownTransitionType(String),
    #[error("{effect_type}: missing parameter '{param}'")]
    MissingParameter { effect_type: String, param: String },
    #[error("{effect_type}: unknown parameter '{param}'")]
    UnknownParameter { effect_type: String, param: String },
    #[error("{effect_type}: invalid parameter '{param}': {reason}")]
    InvalidParameter {
        effect_type: String,
        param: String,
        reason: String,
    },
    #[error("speed must be within [0.01, 100], got {0}")]
    InvalidSpeed(f64),
    #[error("gain must be finite and non-negative, got {0}")]
    InvalidGain(f64),
    #[error("transition duration must be positive, got {0}")]
    InvalidDuration(Time),
    #[error("malformed {kind} identifier '{value}'")]
    MalformedId { kind: IdKind, value: String },
    #[error("identifier '{0}' was never issued")]
    UnknownId(String),
    #[error("batch '{0}' contains no operations")]
    EmptyBatch(String),
}

/// Everything a submitted edit can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("another edit is in progress")]
    Busy,
}

/// Reported per instruction inside a render plan, so it is part of the plan schema.
#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ResolutionError {
    #[error("requested range [{start}, {end}) is empty after clamping to the timeline")]
    EmptyRange { start: Time, end: Time },
    #[error("clip {clip_id} references missing media {media_id}")]
    BrokenMediaReference { clip_id: ClipId, media_id: MediaId },
    #[error("resolution was cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("history entry no longer matches the timeline: {0}")]
    Corrupted(String),
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),
    #[error("unsupported schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u64, supported: u32 },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("plugin error: {0}")]
    Plugin(String),
}
