//! Persistence snapshot of a timeline.
//!
//! The engine never touches storage; it hands out and accepts JSON strings. Documents
//! carry a schema version so older files can be upgraded in place before validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LibraryError;
use crate::model::timeline::Timeline;
use crate::util::timing::timed;

pub const TIMELINE_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TimelineDocument {
    pub schema_version: u32,
    pub timeline: Timeline,
}

impl TimelineDocument {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            schema_version: TIMELINE_SCHEMA_VERSION,
            timeline,
        }
    }
}

impl Timeline {
    /// Serializes tracks, clips, effects and transitions. History is never included.
    pub fn save(&self) -> Result<String, LibraryError> {
        let document = TimelineDocument::new(self.clone());
        Ok(serde_json::to_string(&document)?)
    }

    pub fn save_pretty(&self) -> Result<String, LibraryError> {
        let document = TimelineDocument::new(self.clone());
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parses, upgrades and validates a document produced by [`Timeline::save`].
    pub fn load(json_str: &str) -> Result<Self, LibraryError> {
        timed("Load timeline document", || -> Result<Timeline, LibraryError> {
            let mut raw: Value = serde_json::from_str(json_str)?;
            migrate(&mut raw)?;
            let document: TimelineDocument = serde_json::from_value(raw)?;
            document.timeline.validate()?;
            Ok(document.timeline)
        })
    }
}

/// Upgrades a raw document to the current schema.
fn migrate(raw: &mut Value) -> Result<(), LibraryError> {
    let version = raw
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    match version {
        0 => {
            // Unversioned snapshots stored the bare timeline object.
            log::info!("Upgrading unversioned timeline document");
            let timeline = raw.take();
            *raw = serde_json::json!({
                "schema_version": TIMELINE_SCHEMA_VERSION,
                "timeline": timeline,
            });
            Ok(())
        }
        v if v == TIMELINE_SCHEMA_VERSION as u64 => Ok(()),
        v => Err(LibraryError::UnsupportedSchema {
            found: v,
            supported: TIMELINE_SCHEMA_VERSION,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_timeline_is_upgraded() {
        let bare = serde_json::to_string(&Timeline::default()).unwrap();
        let loaded = Timeline::load(&bare).unwrap();
        assert_eq!(loaded, Timeline::default());
    }

    #[test]
    fn future_schema_is_rejected() {
        let json = r#"{"schema_version": 99, "timeline": {}}"#;
        assert!(matches!(
            Timeline::load(json),
            Err(LibraryError::UnsupportedSchema { found: 99, .. })
        ));
    }
}
