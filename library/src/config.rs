//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid configuration:
//!
//! ```toml
//! [history]
//! max_depth = 200
//!
//! [audio]
//! ducking_attenuation = 0.3
//!
//! [preview]
//! max_queries_per_second = 24.0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::model::time::Time;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub history: HistoryConfig,
    pub audio: AudioConfig,
    pub preview: PreviewConfig,
    pub export: ExportConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Oldest entries are dropped beyond this many undo steps.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Gain multiplier applied to non-priority tracks while audio tracks overlap.
    pub ducking_attenuation: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ducking_attenuation: 0.25,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Upper bound on resolution queries issued by the playback clock.
    pub max_queries_per_second: f64,
    /// Length of the range resolved ahead of the playhead, in milliseconds.
    pub window_ms: u64,
    /// Number of preview plans kept in the LRU cache.
    pub cache_capacity: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_queries_per_second: 30.0,
            window_ms: 500,
            cache_capacity: 64,
        }
    }
}

impl PreviewConfig {
    /// Spacing between clock queries. Rates outside `[0.01, 1000]` per second (or not a
    /// number) are clamped, so configs built in code without `validate` stay usable.
    pub fn min_query_interval(&self) -> Duration {
        let rate = self.max_queries_per_second;
        let rate = if rate.is_nan() { Self::default().max_queries_per_second } else { rate };
        Duration::from_secs_f64(1.0 / rate.clamp(0.01, 1000.0))
    }

    pub fn window(&self) -> Time {
        Time::from_millis(self.window_ms as i64)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Resolve export plans on the rayon pool.
    pub parallel: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, LibraryError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.history.max_depth == 0 {
            return Err(LibraryError::InvalidConfig(
                "history.max_depth must be at least 1".to_string(),
            ));
        }
        let attenuation = self.audio.ducking_attenuation;
        if !(0.0..=1.0).contains(&attenuation) {
            return Err(LibraryError::InvalidConfig(format!(
                "audio.ducking_attenuation must be within [0, 1], got {attenuation}"
            )));
        }
        let rate = self.preview.max_queries_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(LibraryError::InvalidConfig(format!(
                "preview.max_queries_per_second must be positive, got {rate}"
            )));
        }
        if self.preview.window_ms == 0 {
            return Err(LibraryError::InvalidConfig(
                "preview.window_ms must be positive".to_string(),
            ));
        }
        if self.preview.cache_capacity == 0 {
            return Err(LibraryError::InvalidConfig(
                "preview.cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_interval_is_clamped() {
        let stalled = PreviewConfig {
            max_queries_per_second: 0.0,
            ..PreviewConfig::default()
        };
        assert_eq!(stalled.min_query_interval(), Duration::from_secs(100));
        let unset = PreviewConfig {
            max_queries_per_second: f64::NAN,
            ..PreviewConfig::default()
        };
        assert_eq!(unset.min_query_interval(), PreviewConfig::default().min_query_interval());
    }

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = EngineConfig::from_toml_str(
            "[history]\nmax_depth = 5\n[audio]\nducking_attenuation = 0.5\n",
        )
        .unwrap();
        assert_eq!(config.history.max_depth, 5);
        assert_eq!(config.audio.ducking_attenuation, 0.5);
        assert_eq!(config.preview, PreviewConfig::default());
    }

    #[test]
    fn out_of_range_attenuation_is_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[audio]\nducking_attenuation = 2.0\n"),
            Err(LibraryError::InvalidConfig(_))
        ));
    }
}
