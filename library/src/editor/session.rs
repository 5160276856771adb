//! Shared editing session.
//!
//! The published timeline lives behind an `RwLock` as an immutable `Arc` snapshot, so
//! resolution queries clone the `Arc` and never wait on an edit. Writers serialize on a
//! separate mutex and compute the next timeline without holding the read lock; the lock
//! is only taken to swap the pointer.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};

use crate::config::EngineConfig;
use crate::editor::history::HistoryManager;
use crate::editor::operation::Operation;
use crate::error::{EditError, LibraryError};
use crate::model::ids::{ClipId, EffectId, IdRegistry, TrackId, TransitionId};
use crate::model::time::Time;
use crate::model::timeline::Timeline;
use crate::plugin::traits::StudioContext;

/// A published timeline and the number of edits that produced it.
#[derive(Clone, Debug)]
pub struct TimelineSnapshot {
    pub revision: u64,
    pub timeline: Arc<Timeline>,
}

pub struct EditorSession {
    current: RwLock<TimelineSnapshot>,
    history: Mutex<HistoryManager>,
    ids: Mutex<IdRegistry>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovering poisoned editor lock");
        poisoned.into_inner()
    })
}

impl EditorSession {
    pub fn new(timeline: Timeline, config: &EngineConfig) -> Self {
        let ids = IdRegistry::seeded_from(&timeline);
        Self {
            current: RwLock::new(TimelineSnapshot {
                revision: 0,
                timeline: Arc::new(timeline),
            }),
            history: Mutex::new(HistoryManager::new(config.history.max_depth)),
            ids: Mutex::new(ids),
        }
    }

    /// Opens a session from a saved document.
    pub fn load(json_str: &str, config: &EngineConfig) -> Result<Self, LibraryError> {
        let timeline = Timeline::load(json_str)?;
        log::info!("Loaded timeline with {} tracks", timeline.track_count());
        Ok(Self::new(timeline, config))
    }

    pub fn save(&self) -> Result<String, LibraryError> {
        self.snapshot().timeline.save()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, timeline: Timeline, bump: bool) -> TimelineSnapshot {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if bump {
            guard.revision += 1;
        }
        guard.timeline = Arc::new(timeline);
        guard.clone()
    }

    /// Applies an operation and records it, waiting for any edit already in progress.
    pub fn submit(&self, operation: Operation) -> Result<TimelineSnapshot, EditError> {
        let mut history = lock(&self.history);
        self.submit_locked(&mut history, operation)
    }

    /// Like [`EditorSession::submit`] but fails with `Busy` instead of waiting.
    pub fn try_submit(&self, operation: Operation) -> Result<TimelineSnapshot, EditError> {
        let mut history = match self.history.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(EditError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        self.submit_locked(&mut history, operation)
    }

    fn submit_locked(
        &self,
        history: &mut HistoryManager,
        operation: Operation,
    ) -> Result<TimelineSnapshot, EditError> {
        let label = operation.label();
        let current = self.snapshot();
        let next = history
            .apply(&current.timeline, operation)
            .inspect_err(|err| log::debug!("Rejected '{}': {}", label, err))?;
        lock(&self.ids).observe(&next);
        let snapshot = self.publish(next, true);
        log::debug!("Applied '{}' (revision {})", label, snapshot.revision);
        Ok(snapshot)
    }

    /// Steps back one entry. `None` when there is nothing to undo.
    pub fn undo(&self) -> Option<TimelineSnapshot> {
        let mut history = lock(&self.history);
        let current = self.snapshot();
        let previous = history.undo(&current.timeline)?;
        Some(self.publish(previous, true))
    }

    pub fn redo(&self) -> Option<TimelineSnapshot> {
        let mut history = lock(&self.history);
        let current = self.snapshot();
        let next = history.redo(&current.timeline)?;
        Some(self.publish(next, true))
    }

    /// Moves the playhead without touching history or the revision counter.
    pub fn set_playhead(&self, position: Time) -> TimelineSnapshot {
        let _history = lock(&self.history);
        let current = self.snapshot();
        self.publish(current.timeline.with_playhead(position), false)
    }

    pub fn can_undo(&self) -> bool {
        lock(&self.history).can_undo()
    }

    pub fn can_redo(&self) -> bool {
        lock(&self.history).can_redo()
    }

    pub fn undo_label(&self) -> Option<String> {
        lock(&self.history).undo_label().map(str::to_string)
    }

    pub fn redo_label(&self) -> Option<String> {
        lock(&self.history).redo_label().map(str::to_string)
    }

    /// Runs `f` with exclusive access to the identifier registry.
    pub fn with_ids<R>(&self, f: impl FnOnce(&mut IdRegistry) -> R) -> R {
        let mut ids = lock(&self.ids);
        f(&mut *ids)
    }

    pub fn new_track_id(&self) -> TrackId {
        lock(&self.ids).track()
    }

    pub fn new_clip_id(&self) -> ClipId {
        lock(&self.ids).clip()
    }

    pub fn new_effect_id(&self) -> EffectId {
        lock(&self.ids).effect()
    }

    pub fn new_transition_id(&self) -> TransitionId {
        lock(&self.ids).transition()
    }
}

impl StudioContext for EditorSession {
    fn snapshot(&self) -> TimelineSnapshot {
        EditorSession::snapshot(self)
    }

    fn submit(&self, operation: Operation) -> Result<TimelineSnapshot, EditError> {
        EditorSession::submit(self, operation)
    }

    fn undo(&self) -> Option<TimelineSnapshot> {
        EditorSession::undo(self)
    }

    fn redo(&self) -> Option<TimelineSnapshot> {
        EditorSession::redo(self)
    }

    fn new_track_id(&self) -> TrackId {
        EditorSession::new_track_id(self)
    }

    fn new_clip_id(&self) -> ClipId {
        EditorSession::new_clip_id(self)
    }

    fn new_effect_id(&self) -> EffectId {
        EditorSession::new_effect_id(self)
    }
}
