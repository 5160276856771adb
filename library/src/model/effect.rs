//! Clip effects.
//!
//! Effects cross the API boundary as an [`EffectDescriptor`] (type tag plus a flat
//! parameter map) and are converted once into the closed [`EffectKind`] enum. Unknown
//! types and parameters are rejected at conversion time so the core never carries opaque
//! maps.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::OperationError;
use crate::model::ids::EffectId;
use crate::model::time::Time;

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(untagged)]
pub enum ParamValue {
    Number(OrderedFloat<f64>),
    Boolean(bool),
    Text(String),
}

impl ParamValue {
    pub fn number(value: f64) -> Self {
        ParamValue::Number(OrderedFloat(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        ParamValue::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(n.into_inner()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Untyped boundary form of an effect or transition.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct EffectDescriptor {
    pub effect_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl EffectDescriptor {
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Reads typed parameters out of a descriptor and remembers which keys were consumed.
pub(crate) struct ParamReader<'a> {
    descriptor: &'a EffectDescriptor,
    consumed: Vec<&'a str>,
}

impl<'a> ParamReader<'a> {
    pub(crate) fn new(descriptor: &'a EffectDescriptor) -> Self {
        Self {
            descriptor,
            consumed: Vec::new(),
        }
    }

    fn invalid(&self, param: &str, reason: impl Into<String>) -> OperationError {
        OperationError::InvalidParameter {
            effect_type: self.descriptor.effect_type.clone(),
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    fn raw(&mut self, param: &'a str) -> Option<&'a ParamValue> {
        let value = self.descriptor.params.get(param)?;
        self.consumed.push(param);
        Some(value)
    }

    pub(crate) fn number_or(
        &mut self,
        param: &'a str,
        default: f64,
        min: f64,
        max: f64,
    ) -> Result<f64, OperationError> {
        let value = match self.raw(param) {
            None => default,
            Some(raw) => raw
                .as_number()
                .ok_or_else(|| self.invalid(param, "expected a number"))?,
        };
        if !value.is_finite() || value < min || value > max {
            return Err(self.invalid(param, format!("must be within [{min}, {max}]")));
        }
        Ok(value)
    }

    pub(crate) fn required_number(
        &mut self,
        param: &'a str,
        min: f64,
        max: f64,
    ) -> Result<f64, OperationError> {
        if !self.descriptor.params.contains_key(param) {
            return Err(OperationError::MissingParameter {
                effect_type: self.descriptor.effect_type.clone(),
                param: param.to_string(),
            });
        }
        self.number_or(param, 0.0, min, max)
    }

    pub(crate) fn required_text(&mut self, param: &'a str) -> Result<String, OperationError> {
        match self.raw(param) {
            None => Err(OperationError::MissingParameter {
                effect_type: self.descriptor.effect_type.clone(),
                param: param.to_string(),
            }),
            Some(raw) => raw
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(param, "expected text")),
        }
    }

    pub(crate) fn text_or(&mut self, param: &'a str, default: &str) -> Result<String, OperationError> {
        match self.raw(param) {
            None => Ok(default.to_string()),
            Some(raw) => raw
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(param, "expected text")),
        }
    }

    /// Fails on any parameter that was never read.
    pub(crate) fn finish(self) -> Result<(), OperationError> {
        let descriptor = self.descriptor;
        match descriptor
            .params
            .keys()
            .find(|key| !self.consumed.contains(&key.as_str()))
        {
            Some(unknown) => Err(OperationError::UnknownParameter {
                effect_type: descriptor.effect_type.clone(),
                param: unknown.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    Opacity { amount: f64 },
    Brightness { amount: f64 },
    Contrast { amount: f64 },
    Saturation { amount: f64 },
    GaussianBlur { radius: f64 },
    ChromaKey { key_color: String, tolerance: f64 },
    Crop { left: f64, top: f64, right: f64, bottom: f64 },
    AudioFade { fade_in: Time, fade_out: Time },
    Caption { text: String },
    Highlight { label: String, score: f64 },
}

impl EffectKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            EffectKind::Opacity { .. } => "opacity",
            EffectKind::Brightness { .. } => "brightness",
            EffectKind::Contrast { .. } => "contrast",
            EffectKind::Saturation { .. } => "saturation",
            EffectKind::GaussianBlur { .. } => "gaussian_blur",
            EffectKind::ChromaKey { .. } => "chroma_key",
            EffectKind::Crop { .. } => "crop",
            EffectKind::AudioFade { .. } => "audio_fade",
            EffectKind::Caption { .. } => "caption",
            EffectKind::Highlight { .. } => "highlight",
        }
    }

    pub fn from_descriptor(descriptor: &EffectDescriptor) -> Result<Self, OperationError> {
        let mut params = ParamReader::new(descriptor);
        let kind = match descriptor.effect_type.as_str() {
            "opacity" => EffectKind::Opacity {
                amount: params.required_number("amount", 0.0, 1.0)?,
            },
            "brightness" => EffectKind::Brightness {
                amount: params.required_number("amount", -1.0, 1.0)?,
            },
            "contrast" => EffectKind::Contrast {
                amount: params.required_number("amount", 0.0, 4.0)?,
            },
            "saturation" => EffectKind::Saturation {
                amount: params.required_number("amount", 0.0, 4.0)?,
            },
            "gaussian_blur" => EffectKind::GaussianBlur {
                radius: params.required_number("radius", 0.0, 500.0)?,
            },
            "chroma_key" => {
                let key_color = params.required_text("key_color")?;
                if !is_hex_color(&key_color) {
                    return Err(OperationError::InvalidParameter {
                        effect_type: descriptor.effect_type.clone(),
                        param: "key_color".to_string(),
                        reason: "expected #rrggbb".to_string(),
                    });
                }
                EffectKind::ChromaKey {
                    key_color,
                    tolerance: params.number_or("tolerance", 0.1, 0.0, 1.0)?,
                }
            }
            "crop" => EffectKind::Crop {
                left: params.number_or("left", 0.0, 0.0, 1.0)?,
                top: params.number_or("top", 0.0, 0.0, 1.0)?,
                right: params.number_or("right", 0.0, 0.0, 1.0)?,
                bottom: params.number_or("bottom", 0.0, 0.0, 1.0)?,
            },
            "audio_fade" => EffectKind::AudioFade {
                fade_in: Time::from_secs_f64(params.number_or("fade_in", 0.0, 0.0, 3600.0)?),
                fade_out: Time::from_secs_f64(params.number_or("fade_out", 0.0, 0.0, 3600.0)?),
            },
            "caption" => EffectKind::Caption {
                text: params.required_text("text")?,
            },
            "highlight" => EffectKind::Highlight {
                label: params.text_or("label", "")?,
                score: params.number_or("score", 1.0, 0.0, 1.0)?,
            },
            other => return Err(OperationError::UnknownEffectType(other.to_string())),
        };
        params.finish()?;
        Ok(kind)
    }

    pub fn to_descriptor(&self) -> EffectDescriptor {
        let descriptor = EffectDescriptor::new(self.type_tag());
        match self {
            EffectKind::Opacity { amount }
            | EffectKind::Brightness { amount }
            | EffectKind::Contrast { amount }
            | EffectKind::Saturation { amount } => {
                descriptor.with("amount", ParamValue::number(*amount))
            }
            EffectKind::GaussianBlur { radius } => {
                descriptor.with("radius", ParamValue::number(*radius))
            }
            EffectKind::ChromaKey {
                key_color,
                tolerance,
            } => descriptor
                .with("key_color", ParamValue::text(key_color.clone()))
                .with("tolerance", ParamValue::number(*tolerance)),
            EffectKind::Crop {
                left,
                top,
                right,
                bottom,
            } => descriptor
                .with("left", ParamValue::number(*left))
                .with("top", ParamValue::number(*top))
                .with("right", ParamValue::number(*right))
                .with("bottom", ParamValue::number(*bottom)),
            EffectKind::AudioFade { fade_in, fade_out } => descriptor
                .with("fade_in", ParamValue::number(fade_in.as_secs_f64()))
                .with("fade_out", ParamValue::number(fade_out.as_secs_f64())),
            EffectKind::Caption { text } => descriptor.with("text", ParamValue::text(text.clone())),
            EffectKind::Highlight { label, score } => descriptor
                .with("label", ParamValue::text(label.clone()))
                .with("score", ParamValue::number(*score)),
        }
    }

    /// Applies the descriptor rules to an already typed effect, so values that arrive
    /// through operation JSON or a saved document get the same range checks.
    pub fn validate(&self) -> Result<(), OperationError> {
        Self::from_descriptor(&self.to_descriptor()).map(|_| ())
    }

    /// Effects that only influence the audio mix.
    pub fn is_audio(&self) -> bool {
        matches!(self, EffectKind::AudioFade { .. })
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Effect {
    pub id: EffectId,
    pub kind: EffectKind,
}

impl Effect {
    pub fn new(id: EffectId, kind: EffectKind) -> Self {
        Self { id, kind }
    }

    pub fn from_descriptor(
        id: EffectId,
        descriptor: &EffectDescriptor,
    ) -> Result<Self, OperationError> {
        Ok(Self {
            id,
            kind: EffectKind::from_descriptor(descriptor)?,
        })
    }
}
