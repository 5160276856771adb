use std::sync::Arc;

use composition_engine::LibraryError;
use composition_engine::model::effect::{EffectDescriptor, ParamValue};
use composition_engine::model::timeline::{Rational, Resolution, TimelineSettings};
use composition_engine::model::{MediaRef, Time, TimeRange};
use composition_engine::plugin::{
    EffectPreset, ExportPreset, Highlight, HighlightDetector, Plugin, StudioPlugin,
};

/// Studio for talk recordings: loudness-friendly fades, audiogram exports and
/// chapter markers.
pub struct PodcastStudio {
    chapter_length: Time,
}

impl PodcastStudio {
    pub fn new(chapter_length: Time) -> Self {
        Self { chapter_length }
    }
}

impl Default for PodcastStudio {
    fn default() -> Self {
        Self::new(Time::from_secs(10 * 60))
    }
}

impl Plugin for PodcastStudio {
    fn id(&self) -> &'static str {
        "podcast_studio"
    }

    fn name(&self) -> String {
        "Podcast Studio".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }
}

impl StudioPlugin for PodcastStudio {
    fn effects(&self) -> Vec<EffectPreset> {
        vec![
            EffectPreset::new(
                "intro_fade",
                "Intro/Outro Fade",
                EffectDescriptor::new("audio_fade")
                    .with("fade_in", ParamValue::number(2.0))
                    .with("fade_out", ParamValue::number(3.0)),
            ),
            EffectPreset::new(
                "speaker_blur",
                "Background Blur",
                EffectDescriptor::new("gaussian_blur").with("radius", ParamValue::number(24.0)),
            ),
        ]
    }

    fn highlight_detector(&self) -> Option<Arc<dyn HighlightDetector>> {
        Some(Arc::new(ChapterMarkers {
            chapter_length: self.chapter_length,
        }))
    }

    fn export_presets(&self) -> Vec<ExportPreset> {
        vec![ExportPreset {
            id: "audiogram_square".to_string(),
            label: "Audiogram (square)".to_string(),
            settings: TimelineSettings {
                aspect_ratio: Rational::new(1, 1),
                frame_rate: Rational::new(25, 1),
                resolution: Resolution {
                    width: 1080,
                    height: 1080,
                },
            },
        }]
    }
}

/// Splits a recording into fixed-length chapters. The last chapter takes the remainder.
struct ChapterMarkers {
    chapter_length: Time,
}

impl HighlightDetector for ChapterMarkers {
    fn id(&self) -> &str {
        "chapter_markers"
    }

    fn detect(&self, media: &MediaRef) -> Result<Vec<Highlight>, LibraryError> {
        if !self.chapter_length.is_positive() {
            return Err(LibraryError::Plugin(
                "chapter length must be positive".to_string(),
            ));
        }
        let mut chapters = Vec::new();
        let mut start = Time::ZERO;
        while start < media.source_duration {
            let end = (start + self.chapter_length).min(media.source_duration);
            chapters.push(Highlight {
                media_id: media.media_id,
                source: TimeRange::new(start, end),
                label: format!("Chapter {}", chapters.len() + 1),
                score: 1.0,
            });
            start = end;
        }
        log::debug!("Found {} chapters in {}", chapters.len(), media.media_id);
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composition_engine::model::MediaId;
    use composition_engine::model::ids::EffectId;
    use composition_engine::plugin::PluginManager;

    #[test]
    fn chapters_cover_the_recording() {
        let manager = PluginManager::with_builtin();
        manager.register_studio(Arc::new(PodcastStudio::new(Time::from_secs(60))));

        let media = MediaRef::new(MediaId::new_v4(), Time::from_secs(150));
        let chapters = manager.detect_highlights("podcast_studio", &media).unwrap();
        let ranges: Vec<TimeRange> = chapters.iter().map(|h| h.source).collect();
        assert_eq!(
            ranges,
            vec![
                TimeRange::new(Time::ZERO, Time::from_secs(60)),
                TimeRange::new(Time::from_secs(60), Time::from_secs(120)),
                TimeRange::new(Time::from_secs(120), Time::from_secs(150)),
            ]
        );
        assert_eq!(chapters[2].label, "Chapter 3");
    }

    #[test]
    fn presets_are_valid_effects() {
        let manager = PluginManager::new();
        manager.register_studio(Arc::new(PodcastStudio::default()));
        for preset in manager.effect_presets("podcast_studio").unwrap() {
            manager
                .instantiate_effect("podcast_studio", &preset.id, EffectId::new_v4())
                .unwrap();
        }
        assert_eq!(manager.studios().len(), 1);
    }
}
