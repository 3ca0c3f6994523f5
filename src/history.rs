//! Undo/redo over full-scene snapshots.
//!
//! DESIGN
//! ======
//! Two bounded stacks of `SceneSnapshot`s. A snapshot is taken *before* a
//! mutation takes effect, so undo returns to the state preceding the action
//! that recorded it. Recording clears the redo stack (linear history).
//!
//! Re-entrancy is an explicit mode rather than free-floating flags:
//! - `Restoring`: a snapshot is being rehydrated; recording is suppressed so
//!   the intermediate states of the restore never enter history.
//! - `BatchCreating`: one user action is creating several entities; the
//!   caller records a single "before" state and the per-entity records that
//!   follow are suppressed.
//!
//! Undo/redo never touch the backend. Restored state is re-synced by the
//! next autosave or explicit persistence call.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::DEFAULT_MAX_HISTORY;
use crate::scene::{Entity, Scene};
use crate::viewport::Viewport;

/// Serialized copy of the persistent scene plus view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Non-transient entities in draw order, derived display state cleared.
    pub entities: Vec<Entity>,
    pub viewport: Viewport,
    pub taken_at_ms: i64,
}

impl SceneSnapshot {
    /// Capture the current scene and viewport.
    #[must_use]
    pub fn capture(scene: &Scene, viewport: Viewport) -> Self {
        Self { entities: scene.snapshot_entities(), viewport, taken_at_ms: now_ms() }
    }
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Re-entrancy state of the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    #[default]
    Idle,
    Restoring,
    BatchCreating,
}

/// Bounded linear undo/redo history.
#[derive(Debug)]
pub struct HistoryManager {
    undo: VecDeque<SceneSnapshot>,
    redo: VecDeque<SceneSnapshot>,
    max_depth: usize,
    mode: HistoryMode,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    /// Create an empty history keeping at most `max_depth` snapshots per stack.
    /// A depth of zero is treated as one.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { undo: VecDeque::new(), redo: VecDeque::new(), max_depth: max_depth.max(1), mode: HistoryMode::Idle }
    }

    /// Push the pre-mutation state. Returns `false` if suppressed by the
    /// current mode.
    pub fn record(&mut self, before: SceneSnapshot) -> bool {
        if self.mode != HistoryMode::Idle {
            debug!(mode = ?self.mode, "history record suppressed");
            return false;
        }
        push_bounded(&mut self.undo, before, self.max_depth);
        self.redo.clear();
        true
    }

    /// Step back. `current` goes onto the redo stack and the previous state
    /// is returned for restoring; the manager enters `Restoring` until
    /// [`finish_restore`](Self::finish_restore).
    pub fn undo(&mut self, current: SceneSnapshot) -> Option<SceneSnapshot> {
        if self.mode != HistoryMode::Idle {
            return None;
        }
        let previous = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current, self.max_depth);
        self.mode = HistoryMode::Restoring;
        Some(previous)
    }

    /// Step forward. Symmetric to [`undo`](Self::undo).
    pub fn redo(&mut self, current: SceneSnapshot) -> Option<SceneSnapshot> {
        if self.mode != HistoryMode::Idle {
            return None;
        }
        let next = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current, self.max_depth);
        self.mode = HistoryMode::Restoring;
        Some(next)
    }

    /// Leave `Restoring` once the restored scene is fully rehydrated.
    pub fn finish_restore(&mut self) {
        if self.mode == HistoryMode::Restoring {
            self.mode = HistoryMode::Idle;
        }
    }

    /// Enter batch-creation mode. Returns `false` if already busy.
    pub fn begin_batch(&mut self) -> bool {
        if self.mode != HistoryMode::Idle {
            return false;
        }
        self.mode = HistoryMode::BatchCreating;
        true
    }

    pub fn end_batch(&mut self) {
        if self.mode == HistoryMode::BatchCreating {
            self.mode = HistoryMode::Idle;
        }
    }

    #[must_use]
    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Forget all history and return to `Idle`.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.mode = HistoryMode::Idle;
    }
}

fn push_bounded(stack: &mut VecDeque<SceneSnapshot>, snapshot: SceneSnapshot, max_depth: usize) {
    stack.push_back(snapshot);
    while stack.len() > max_depth {
        stack.pop_front();
    }
}
