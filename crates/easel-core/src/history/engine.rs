//! Capture/restore state machine over a [`HistoryStack`].

use super::stack::{HistoryCounts, HistoryStack};

/// What the engine is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryState {
    #[default]
    Idle,
    /// A mutation was seen; a snapshot is appended at the end of the turn.
    Capturing,
    /// A snapshot is being loaded; mutation events are not recorded.
    Restoring,
}

/// Undo/redo bookkeeping independent of any scene.
#[derive(Debug, Clone, Default)]
pub struct HistoryEngine {
    stack: HistoryStack,
    state: HistoryState,
    /// Cursor before the restore in flight.
    restore_from: Option<usize>,
}

impl HistoryEngine {
    pub fn new(max_len: usize) -> Self {
        Self {
            stack: HistoryStack::new(max_len),
            ..Self::default()
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn stack(&self) -> &HistoryStack {
        &self.stack
    }

    pub fn counts(&self) -> HistoryCounts {
        self.stack.counts()
    }

    /// Forget everything and start from `snapshot`.
    pub fn seed(&mut self, snapshot: String) {
        self.stack.seed(snapshot);
        self.state = HistoryState::Idle;
        self.restore_from = None;
    }

    /// A qualifying mutation happened. Returns whether it will be recorded.
    pub fn on_mutation(&mut self) -> bool {
        match self.state {
            HistoryState::Idle | HistoryState::Capturing => {
                self.state = HistoryState::Capturing;
                true
            }
            HistoryState::Restoring => false,
        }
    }

    /// Close a pending capture with the current scene snapshot.
    ///
    /// Returns whether a new entry was appended.
    pub fn commit(&mut self, snapshot: String) -> bool {
        if self.state != HistoryState::Capturing {
            return false;
        }
        self.state = HistoryState::Idle;
        self.stack.push(snapshot)
    }

    pub fn is_capturing(&self) -> bool {
        self.state == HistoryState::Capturing
    }

    pub fn is_restoring(&self) -> bool {
        self.state == HistoryState::Restoring
    }

    /// Start an undo. Returns the snapshot to load, or `None` if there is
    /// nothing to undo or a restore is already in flight.
    pub fn begin_undo(&mut self) -> Option<String> {
        if self.state == HistoryState::Restoring {
            return None;
        }
        let cursor = self.stack.cursor();
        let snapshot = self.stack.step_back()?.to_string();
        self.start_restore(cursor);
        Some(snapshot)
    }

    /// Start a redo. The cursor already points past the snapshot returned.
    pub fn begin_redo(&mut self) -> Option<String> {
        if self.state == HistoryState::Restoring {
            return None;
        }
        let cursor = self.stack.cursor();
        let snapshot = self.stack.step_forward()?.to_string();
        self.start_restore(cursor);
        Some(snapshot)
    }

    fn start_restore(&mut self, previous_cursor: usize) {
        self.restore_from = Some(previous_cursor);
        self.state = HistoryState::Restoring;
    }

    /// The loaded snapshot is on screen. Returns the new counts, or `None`
    /// if no restore was in flight.
    pub fn finish_restore(&mut self) -> Option<HistoryCounts> {
        if self.state != HistoryState::Restoring {
            return None;
        }
        self.state = HistoryState::Idle;
        self.restore_from = None;
        Some(self.counts())
    }

    /// The load failed: put the cursor back and go idle.
    pub fn abort_restore(&mut self) {
        if let Some(cursor) = self.restore_from.take() {
            self.stack.restore_cursor(cursor);
        }
        self.state = HistoryState::Idle;
    }
}
