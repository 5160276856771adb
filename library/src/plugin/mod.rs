//! Studio plugins and the annotation import helpers they use.

pub mod annotations;
pub mod builtin;
pub mod manager;
pub mod traits;

pub use annotations::{
    Annotation, AnnotationImport, Highlight, ImportReport, SkipReason, SkippedAnnotation,
    SubtitleCue, import_annotations, plan_import,
};
pub use builtin::BuiltinStudio;
pub use manager::PluginManager;
pub use traits::{
    EffectPreset, ExportPreset, HighlightDetector, Plugin, StudioContext, StudioPlugin,
};
