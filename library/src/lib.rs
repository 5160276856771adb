//! Timeline composition engine.
//!
//! The engine owns the authoritative model of a multi-track edit, validates every
//! mutation against its invariants, records reversible history and compiles timeline
//! snapshots into render plans for an external processing engine. It never decodes or
//! encodes media itself.

pub mod cache;
pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod playback;
pub mod plugin;
pub mod rendering;
pub mod util;

pub use config::EngineConfig;
pub use editor::{EditorSession, HistoryManager, Operation, TimelineSnapshot};
pub use error::{
    EditError, HistoryError, LibraryError, OperationError, ResolutionError, ValidationError,
};
pub use model::{Clip, Time, TimeRange, Timeline, Track, TrackKind};
pub use rendering::{MediaProvider, QualityTier, RenderPlan, Resolver};

use std::sync::Arc;

/// Resolves a whole saved document at `tier`. Export entry point used by the CLI.
pub fn resolve_document(
    json_str: &str,
    provider: Arc<dyn MediaProvider>,
    config: &EngineConfig,
    tier: QualityTier,
    range: Option<TimeRange>,
) -> Result<RenderPlan, LibraryError> {
    let timeline = Timeline::load(json_str)?;
    let range = range.unwrap_or(TimeRange::new(Time::ZERO, timeline.duration()));
    let options = rendering::ResolveOptions::new(tier, range).parallel(config.export.parallel);
    let plan = Resolver::from_config(provider, config).resolve_with(&timeline, &options)?;
    Ok(plan)
}
