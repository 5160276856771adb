pub mod clock;
pub mod driver;

pub use clock::{PlaybackClock, PlaybackState, PreviewRequest};
pub use driver::{PreviewCommand, PreviewDriver, PreviewHandle, PreviewJob, spawn_preview_loop};
