//! Undo/redo over applied operations.
//!
//! Each entry keeps the operation that was applied and the structural inverse that
//! restores the timeline it was applied to. Undo applies the inverse; redo re-applies
//! the operation, which is deterministic because operations carry the ids they create.
//! If either step no longer fits the current timeline the history is dropped and the
//! current state kept.

use std::collections::VecDeque;

use crate::editor::operation::{self, InverseOperation, Operation};
use crate::error::{EditError, HistoryError};
use crate::model::timeline::Timeline;

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub label: String,
    operation: Operation,
    inverse: InverseOperation,
}

impl HistoryEntry {
    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_depth: usize,
}

impl HistoryManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Applies `operation` to `timeline` and records it. Rejected operations leave the
    /// history untouched.
    pub fn apply(&mut self, timeline: &Timeline, operation: Operation) -> Result<Timeline, EditError> {
        let (next, inverse) = operation::apply(timeline, &operation)?;
        self.record(operation, inverse);
        Ok(next)
    }

    /// Pushes an applied operation. Clears the redo stack and enforces the depth cap.
    pub fn record(&mut self, operation: Operation, inverse: InverseOperation) {
        let label = operation.label();
        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry {
            label,
            operation,
            inverse,
        });
        while self.undo_stack.len() > self.max_depth {
            if let Some(dropped) = self.undo_stack.pop_front() {
                log::debug!("History full, dropping '{}'", dropped.label);
            }
        }
        log::debug!(
            "History entry pushed (undo depth {})",
            self.undo_stack.len()
        );
    }

    /// Timeline before the most recent entry, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &Timeline) -> Option<Timeline> {
        let entry = self.undo_stack.pop_back()?;
        match entry.inverse.apply(current) {
            Ok(previous) => {
                log::debug!("Undo '{}'", entry.label);
                self.redo_stack.push(entry);
                Some(previous)
            }
            Err(err) => {
                self.discard(&err);
                None
            }
        }
    }

    /// Re-applies the most recently undone entry.
    pub fn redo(&mut self, current: &Timeline) -> Option<Timeline> {
        let entry = self.redo_stack.pop()?;
        match operation::apply(current, &entry.operation) {
            Ok((next, inverse)) => {
                log::debug!("Redo '{}'", entry.label);
                self.undo_stack.push_back(HistoryEntry { inverse, ..entry });
                Some(next)
            }
            Err(err) => {
                self.discard(&HistoryError::Corrupted(err.to_string()));
                None
            }
        }
    }

    fn discard(&mut self, err: &HistoryError) {
        log::warn!("{err}; clearing history and keeping the current timeline");
        self.clear();
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    /// Undo labels, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().map(|e| e.label.as_str())
    }

    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(100)
    }
}
