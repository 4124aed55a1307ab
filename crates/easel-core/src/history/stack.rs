//! Bounded snapshot stack with a cursor.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of undo snapshots to keep.
pub const MAX_UNDO_HISTORY: usize = 100;

/// Undo/redo availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCounts {
    pub undo: usize,
    pub redo: usize,
}

/// Ordered scene snapshots plus the position of the current one.
///
/// Once seeded the cursor stays in `1..=len`: `entries[cursor - 1]` is the
/// snapshot the scene currently shows.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<String>,
    cursor: usize,
    max_len: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl HistoryStack {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_len: max_len.max(1),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drop everything and start over from one snapshot.
    pub fn seed(&mut self, snapshot: String) {
        self.entries.clear();
        self.entries.push_back(snapshot);
        self.cursor = 1;
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    /// Record a new state after the cursor, discarding the redo branch.
    ///
    /// Returns `false` if the snapshot equals the current one.
    pub fn push(&mut self, snapshot: String) -> bool {
        if self.current() == Some(snapshot.as_str()) {
            return false;
        }
        self.entries.truncate(self.cursor);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.max_len {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
        true
    }

    /// Move the cursor back one step and return the snapshot to load.
    pub fn step_back(&mut self) -> Option<&str> {
        if self.cursor <= 1 {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Move the cursor forward one step and return the snapshot to load.
    pub fn step_forward(&mut self) -> Option<&str> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Put the cursor back after a failed restore.
    pub fn restore_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.entries.len());
    }

    pub fn counts(&self) -> HistoryCounts {
        HistoryCounts {
            undo: self.cursor.saturating_sub(1),
            redo: self.entries.len().saturating_sub(self.cursor),
        }
    }

    /// Oldest snapshot still held.
    pub fn oldest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }
}
