use crate::model::effect::{EffectDescriptor, ParamValue};
use crate::model::timeline::{Rational, Resolution, TimelineSettings};
use crate::plugin::traits::{EffectPreset, ExportPreset, Plugin, StudioPlugin};

/// General-purpose studio that ships with the engine.
pub struct BuiltinStudio;

impl Plugin for BuiltinStudio {
    fn id(&self) -> &'static str {
        "builtin"
    }

    fn name(&self) -> String {
        "Builtin Studio".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }
}

impl StudioPlugin for BuiltinStudio {
    fn effects(&self) -> Vec<EffectPreset> {
        vec![
            EffectPreset::new(
                "fade_half",
                "Half Opacity",
                EffectDescriptor::new("opacity").with("amount", ParamValue::number(0.5)),
            ),
            EffectPreset::new(
                "brighten",
                "Brighten",
                EffectDescriptor::new("brightness").with("amount", ParamValue::number(0.2)),
            ),
            EffectPreset::new(
                "punchy",
                "Punchy Contrast",
                EffectDescriptor::new("contrast").with("amount", ParamValue::number(1.3)),
            ),
            EffectPreset::new(
                "monochrome",
                "Monochrome",
                EffectDescriptor::new("saturation").with("amount", ParamValue::number(0.0)),
            ),
            EffectPreset::new(
                "soft_blur",
                "Soft Blur",
                EffectDescriptor::new("gaussian_blur").with("radius", ParamValue::number(8.0)),
            ),
            EffectPreset::new(
                "green_screen",
                "Green Screen",
                EffectDescriptor::new("chroma_key")
                    .with("key_color", ParamValue::text("#00ff00"))
                    .with("tolerance", ParamValue::number(0.2)),
            ),
            EffectPreset::new(
                "letterbox",
                "Letterbox",
                EffectDescriptor::new("crop")
                    .with("top", ParamValue::number(0.12))
                    .with("bottom", ParamValue::number(0.12)),
            ),
            EffectPreset::new(
                "audio_fade",
                "Audio Fade In/Out",
                EffectDescriptor::new("audio_fade")
                    .with("fade_in", ParamValue::number(0.5))
                    .with("fade_out", ParamValue::number(0.5)),
            ),
        ]
    }

    fn export_presets(&self) -> Vec<ExportPreset> {
        vec![
            preset("landscape_1080p", "Landscape 1080p", (16, 9), 1920, 1080),
            preset("vertical_1080p", "Vertical 1080p", (9, 16), 1080, 1920),
            preset("square_1080p", "Square 1080p", (1, 1), 1080, 1080),
        ]
    }
}

fn preset(id: &str, label: &str, aspect: (u32, u32), width: u32, height: u32) -> ExportPreset {
    ExportPreset {
        id: id.to_string(),
        label: label.to_string(),
        settings: TimelineSettings {
            aspect_ratio: Rational::new(aspect.0, aspect.1),
            frame_rate: Rational::new(30, 1),
            resolution: Resolution { width, height },
        },
    }
}
