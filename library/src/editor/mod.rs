//! Editing: operations, their handlers, history and the shared session.

pub mod handlers;
pub mod history;
pub mod operation;
pub mod session;

pub use history::{HistoryEntry, HistoryManager};
pub use operation::{GapPolicy, InverseOperation, NewClip, Operation, apply};
pub use session::{EditorSession, TimelineSnapshot};
