//! Resolution engine: timeline snapshot + quality tier + range -> render plan.

pub mod ducking;
pub mod media;
pub mod plan;
pub mod resolver;
pub mod segments;
pub mod transition;

pub use ducking::{DuckingPolicy, FixedAttenuation, NoDucking};
pub use media::{
    InMemoryMediaLibrary, MediaHandle, MediaNotFound, MediaProvider, QualityTier,
    UriTemplateProvider,
};
pub use plan::{
    AudioInstruction, Blend, BlendRole, CaptionInstruction, CompositeInstruction,
    LayerInstruction, MediaBinding, RENDER_PLAN_SCHEMA_VERSION, Ramp, RenderPlan,
};
pub use resolver::{CancellationToken, ResolveOptions, Resolver, resolve};
