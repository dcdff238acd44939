// src/history.rs
use crate::assets::AssetStore;
use crate::timeline::TimelineState;
use serde::{Deserialize, Serialize};

// Keep memory bounded on long sessions; oldest restore points fall off first.
const MAX_HISTORY: usize = 100;

/// Everything a restore point needs: the whole editable state at one moment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub assets: AssetStore,
    pub timeline: TimelineState,
    pub selection: Option<String>,
}

/// Snapshot-based undo/redo. The caller hands in the *current* state on
/// every operation; this type only owns the stacks.
#[derive(Debug, Default)]
pub struct EditHistory {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-mutation state. Any new action invalidates redo, so
    /// the future stack is cleared here.
    pub fn checkpoint(&mut self, current: Snapshot) {
        self.past.push(current);
        if self.past.len() > MAX_HISTORY {
            self.past.remove(0);
        }
        self.future.clear();
    }

    /// Pop the most recent restore point; the caller's current state moves
    /// onto the redo stack. No-op (None) when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.past.pop()?;
        self.future.push(current);
        Some(restored)
    }

    /// Symmetric to undo, using the future stack.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.future.pop()?;
        self.past.push(current);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}
