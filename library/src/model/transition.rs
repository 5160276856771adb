use serde::{Deserialize, Serialize};

use crate::error::OperationError;
use crate::model::effect::{EffectDescriptor, ParamReader};
use crate::model::ids::{ClipId, TransitionId};
use crate::model::time::{Time, TimeRange};

/// Where a transition sits.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Boundary {
    /// Cut between two touching clips on the same track.
    Cut { left: ClipId, right: ClipId },
    /// Start of a clip that follows empty timeline.
    In { clip: ClipId },
    /// End of a clip that is followed by empty timeline.
    Out { clip: ClipId },
}

impl Boundary {
    pub fn involves(&self, clip_id: ClipId) -> bool {
        match *self {
            Boundary::Cut { left, right } => left == clip_id || right == clip_id,
            Boundary::In { clip } | Boundary::Out { clip } => clip == clip_id,
        }
    }

    /// Points the boundary at `to` wherever it named `from`.
    pub fn rebind(&mut self, from: ClipId, to: ClipId) {
        match self {
            Boundary::Cut { left, right } => {
                if *left == from {
                    *left = to;
                }
                if *right == from {
                    *right = to;
                }
            }
            Boundary::In { clip } | Boundary::Out { clip } => {
                if *clip == from {
                    *clip = to;
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum WipeDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionKind {
    CrossDissolve,
    DipToBlack,
    Wipe { direction: WipeDirection },
}

impl TransitionKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            TransitionKind::CrossDissolve => "cross_dissolve",
            TransitionKind::DipToBlack => "dip_to_black",
            TransitionKind::Wipe { .. } => "wipe",
        }
    }

    /// Progress values (0..1) where the blend curve changes slope.
    pub fn breakpoints(&self) -> &'static [f64] {
        match self {
            TransitionKind::DipToBlack => &[0.5],
            TransitionKind::CrossDissolve | TransitionKind::Wipe { .. } => &[],
        }
    }

    pub fn from_descriptor(descriptor: &EffectDescriptor) -> Result<Self, OperationError> {
        let mut params = ParamReader::new(descriptor);
        let kind = match descriptor.effect_type.as_str() {
            "cross_dissolve" => TransitionKind::CrossDissolve,
            "dip_to_black" => TransitionKind::DipToBlack,
            "wipe" => {
                let direction = match params.text_or("direction", "left_to_right")?.as_str() {
                    "left_to_right" => WipeDirection::LeftToRight,
                    "right_to_left" => WipeDirection::RightToLeft,
                    "top_to_bottom" => WipeDirection::TopToBottom,
                    "bottom_to_top" => WipeDirection::BottomToTop,
                    other => {
                        return Err(OperationError::InvalidParameter {
                            effect_type: descriptor.effect_type.clone(),
                            param: "direction".to_string(),
                            reason: format!("unknown direction '{other}'"),
                        });
                    }
                };
                TransitionKind::Wipe { direction }
            }
            other => return Err(OperationError::UnknownTransitionType(other.to_string())),
        };
        params.finish()?;
        Ok(kind)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Transition {
    pub id: TransitionId,
    pub boundary: Boundary,
    pub kind: TransitionKind,
    pub duration: Time,
}

impl Transition {
    /// Timeline window covered by the blend, given the boundary's edit point.
    ///
    /// Cuts are centred on the edit point; fades sit inside the clip.
    pub fn window(&self, edit_point: Time) -> TimeRange {
        match self.boundary {
            Boundary::Cut { .. } => {
                let half = self.duration.div_f64(2.0);
                TimeRange::new(edit_point - half, edit_point - half + self.duration)
            }
            Boundary::In { .. } => TimeRange::with_duration(edit_point, self.duration),
            Boundary::Out { .. } => TimeRange::new(edit_point - self.duration, edit_point),
        }
    }
}
