//! Linear snapshot history for undo/redo.
//!
//! Every store mutation records an immutable snapshot of the post-mutation
//! state. A cursor points at the snapshot that matches the live state;
//! undo/redo move the cursor and hand back the snapshot to restore.
//! Recording after an undo discards the redo tail (no branching).

use serde::{Deserialize, Serialize};
use web_time::Instant;

use super::frames::FrameIndex;

/// Default maximum number of snapshots kept.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// The mutation that produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Add,
    Delete,
    Update,
    /// Baseline after construction or a clear-all
    Clear,
}

impl HistoryAction {
    /// Get a human-readable description of this action.
    pub fn description(&self) -> &'static str {
        match self {
            HistoryAction::Add => "Add annotation",
            HistoryAction::Delete => "Delete annotation",
            HistoryAction::Update => "Update annotation",
            HistoryAction::Clear => "Clear annotations",
        }
    }
}

/// Immutable copy of the full store state.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    /// Store state right after the action
    pub state: FrameIndex,
    /// What produced this state
    pub action: HistoryAction,
    /// Monotonic sequence number, unique per history
    pub sequence: u64,
    /// When the snapshot was taken
    pub taken_at: Instant,
}

/// Configuration for the history depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of snapshots to keep; `None` keeps everything
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
}

fn default_max_depth() -> Option<usize> {
    Some(DEFAULT_MAX_DEPTH)
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<HistorySnapshot>,
    cursor: usize,
    next_sequence: u64,
    config: HistoryConfig,
}

impl History {
    /// Create a history whose only snapshot is `baseline`.
    pub fn new(baseline: FrameIndex, config: HistoryConfig) -> Self {
        let mut history = Self {
            snapshots: Vec::new(),
            cursor: 0,
            next_sequence: 0,
            config,
        };
        history.reset(baseline);
        history
    }

    /// Drop every snapshot and start over from `baseline`.
    pub fn reset(&mut self, baseline: FrameIndex) {
        self.snapshots.clear();
        let snapshot = self.make_snapshot(baseline, HistoryAction::Clear);
        self.snapshots.push(snapshot);
        self.cursor = 0;
        log::debug!("History reset");
    }

    /// Record the state produced by `action`.
    ///
    /// Discards any snapshots after the cursor, then evicts the oldest
    /// snapshots beyond the configured depth.
    pub fn record(&mut self, state: FrameIndex, action: HistoryAction) {
        self.snapshots.truncate(self.cursor + 1);
        let snapshot = self.make_snapshot(state, action);
        log::debug!(
            "History: recorded '{}' (#{})",
            action.description(),
            snapshot.sequence
        );
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;

        if let Some(max_depth) = self.config.max_depth {
            let max_depth = max_depth.max(1);
            if self.snapshots.len() > max_depth {
                let excess = self.snapshots.len() - max_depth;
                self.snapshots.drain(..excess);
                self.cursor -= excess;
                log::debug!("History: evicted {} oldest snapshot(s)", excess);
            }
        }
    }

    fn make_snapshot(&mut self, state: FrameIndex, action: HistoryAction) -> HistorySnapshot {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        HistorySnapshot {
            state,
            action,
            sequence,
            taken_at: Instant::now(),
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step back; returns the snapshot to restore.
    pub fn undo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_undo() {
            return None;
        }
        let undone = self.snapshots[self.cursor].action;
        self.cursor -= 1;
        log::debug!("⏪ Undo: '{}'", undone.description());
        self.snapshots.get(self.cursor)
    }

    /// Step forward; returns the snapshot to restore.
    pub fn redo(&mut self) -> Option<&HistorySnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        let snapshot = &self.snapshots[self.cursor];
        log::debug!("⏩ Redo: '{}'", snapshot.action.description());
        Some(snapshot)
    }

    /// Description of the action an undo would revert.
    pub fn undo_description(&self) -> Option<&'static str> {
        self.can_undo()
            .then(|| self.snapshots[self.cursor].action.description())
    }

    /// Description of the action a redo would re-apply.
    pub fn redo_description(&self) -> Option<&'static str> {
        self.snapshots
            .get(self.cursor + 1)
            .map(|s| s.action.description())
    }

    /// The snapshot matching the live state.
    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.snapshots.get(self.cursor)
    }

    /// Cursor position (0 = oldest kept snapshot).
    pub fn index(&self) -> usize {
        self.cursor
    }

    /// Number of snapshots kept.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: a history holds at least its baseline.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
