//! Render plan: the output contract consumed by the processing engine.
//!
//! A plan is an ordered list of composite instructions, one per segment of the resolved
//! range. Within a segment every ramp is linear, so a `(start, end)` pair describes the
//! whole curve. Layers are listed bottom to top.

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::model::effect::Effect;
use crate::model::ids::{ClipId, MediaId, TrackId, TransitionId};
use crate::model::time::{Time, TimeRange};
use crate::model::timeline::{Rational, Resolution};
use crate::model::transition::TransitionKind;
use crate::rendering::media::{MediaHandle, QualityTier};

pub const RENDER_PLAN_SCHEMA_VERSION: u32 = 1;

/// Linear value across one segment.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Ramp {
    pub start: f64,
    pub end: f64,
}

impl Ramp {
    pub const ONE: Ramp = Ramp { start: 1.0, end: 1.0 };
    pub const ZERO: Ramp = Ramp { start: 0.0, end: 0.0 };

    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn is_constant(&self) -> bool {
        self.start == self.end
    }

    /// Value at `fraction` (0..1) of the segment.
    pub fn at(&self, fraction: f64) -> f64 {
        self.start + (self.end - self.start) * fraction
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.start * factor, self.end * factor)
    }

    /// Pointwise product. Exact when at most one side varies. Where both vary, segment
    /// boundaries are dense enough that the chord stays within 1/256 of the product.
    pub fn times(self, other: Ramp) -> Self {
        Self::new(self.start * other.start, self.end * other.end)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct MediaBinding {
    pub media_id: MediaId,
    pub tier: QualityTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<MediaHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
}

impl MediaBinding {
    pub fn is_broken(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum BlendRole {
    /// Clip leaving at a cut.
    Outgoing,
    /// Clip entering at a cut.
    Incoming,
    /// Clip appearing from empty timeline.
    FadeIn,
    /// Clip disappearing into empty timeline.
    FadeOut,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Blend {
    pub transition_id: TransitionId,
    pub kind: TransitionKind,
    pub role: BlendRole,
    /// Transition progress, 0 at the start of the window and 1 at its end.
    pub progress: Ramp,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct LayerInstruction {
    pub track_id: TrackId,
    pub track_index: usize,
    pub clip_id: ClipId,
    pub media: MediaBinding,
    /// Source interval shown over the segment. Zero-length while a transition holds
    /// the clip's edge frame.
    pub source: TimeRange,
    pub speed: f64,
    /// Applied in order; the output of effect `i` feeds effect `i + 1`.
    pub effects: Vec<Effect>,
    pub opacity: Ramp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<Blend>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CaptionInstruction {
    pub track_id: TrackId,
    pub track_index: usize,
    pub clip_id: ClipId,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AudioInstruction {
    pub track_id: TrackId,
    pub track_index: usize,
    pub clip_id: ClipId,
    pub media: MediaBinding,
    pub source: TimeRange,
    pub speed: f64,
    /// Final gain including ducking.
    pub gain: Ramp,
    /// Ducking factor already folded into `gain`, kept for inspection.
    pub ducking: f64,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct CompositeInstruction {
    pub range: TimeRange,
    pub layers: Vec<LayerInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captions: Vec<CaptionInstruction>,
    pub audio: Vec<AudioInstruction>,
}

impl CompositeInstruction {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.captions.is_empty() && self.audio.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct RenderPlan {
    pub schema_version: u32,
    pub tier: QualityTier,
    pub range: TimeRange,
    pub frame_rate: Rational,
    pub resolution: Resolution,
    pub instructions: Vec<CompositeInstruction>,
}

impl RenderPlan {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Instruction covering `time`, if inside the plan.
    pub fn instruction_at(&self, time: Time) -> Option<&CompositeInstruction> {
        let idx = self.instructions.partition_point(|i| i.range.end <= time);
        self.instructions.get(idx).filter(|i| i.range.contains(time))
    }

    /// Every broken media reference in the plan, in instruction order.
    pub fn broken_references(&self) -> Vec<&ResolutionError> {
        self.instructions
            .iter()
            .flat_map(|instruction| {
                instruction
                    .layers
                    .iter()
                    .map(|layer| &layer.media)
                    .chain(instruction.audio.iter().map(|audio| &audio.media))
            })
            .filter_map(|binding| binding.error.as_ref())
            .collect()
    }
}
