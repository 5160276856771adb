//! Core plugin traits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::editor::operation::Operation;
use crate::editor::session::TimelineSnapshot;
use crate::error::{EditError, LibraryError};
use crate::model::clip::MediaRef;
use crate::model::effect::EffectDescriptor;
use crate::model::ids::{ClipId, EffectId, TrackId};
use crate::model::timeline::TimelineSettings;
use crate::plugin::annotations::Highlight;

/// Base trait for all plugins.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> String;
    fn version(&self) -> (u32, u32, u32);
    fn impl_type(&self) -> String {
        "Native".to_string()
    }
}

/// A named effect configuration a studio offers in its effect browser.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct EffectPreset {
    pub id: String,
    pub label: String,
    pub descriptor: EffectDescriptor,
}

impl EffectPreset {
    pub fn new(id: &str, label: &str, descriptor: EffectDescriptor) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            descriptor,
        }
    }
}

/// Target settings for a platform export.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ExportPreset {
    pub id: String,
    pub label: String,
    pub settings: TimelineSettings,
}

/// Finds highlight moments in one media item. Detection itself happens outside the
/// engine; a detector only reports what it found.
pub trait HighlightDetector: Send + Sync {
    fn id(&self) -> &str;
    fn detect(&self, media: &MediaRef) -> Result<Vec<Highlight>, LibraryError>;
}

/// Capabilities a studio contributes. The engine only ever sees this interface.
pub trait StudioPlugin: Plugin {
    fn effects(&self) -> Vec<EffectPreset>;

    fn highlight_detector(&self) -> Option<Arc<dyn HighlightDetector>> {
        None
    }

    fn export_presets(&self) -> Vec<ExportPreset>;
}

/// What a studio may do with the timeline: read snapshots and submit operations.
///
/// There is deliberately no mutable access; every change goes through the same
/// validation as an edit made in the editor.
pub trait StudioContext: Send + Sync {
    fn snapshot(&self) -> TimelineSnapshot;
    fn submit(&self, operation: Operation) -> Result<TimelineSnapshot, EditError>;
    fn undo(&self) -> Option<TimelineSnapshot>;
    fn redo(&self) -> Option<TimelineSnapshot>;
    fn new_track_id(&self) -> TrackId;
    fn new_clip_id(&self) -> ClipId;
    fn new_effect_id(&self) -> EffectId;
}
