//! Debounced autosave of annotation and viewport state.
//!
//! DESIGN
//! ======
//! The coordinator is a deadline, not a task: `schedule` pushes the deadline
//! out by the debounce delay, and the owner polls `take_due(now)` from its
//! tick. That keeps the session single-owner (no spawned task holding the
//! scene) and makes the timer deterministic under `tokio::time::pause`.
//!
//! Groups and placements are persisted immediately by their own calls; the
//! autosave payload only carries what has no backend identity of its own.
//! A read-only session never arms the timer and only reports `ReadOnly`.
//! Save failures change the status and nothing else; history is untouched.

#[cfg(test)]
#[path = "autosave_test.rs"]
mod autosave_test;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// User-visible autosave state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    /// Changes are waiting for the debounce window to close.
    Pending,
    Saving,
    Saved,
    Failed,
    /// Session cannot persist; changes stay local.
    ReadOnly,
}

#[derive(Debug)]
pub struct AutosaveCoordinator {
    delay: Duration,
    deadline: Option<Instant>,
    read_only: bool,
    status: SaveStatus,
}

impl AutosaveCoordinator {
    #[must_use]
    pub fn new(delay: Duration, read_only: bool) -> Self {
        let status = if read_only { SaveStatus::ReadOnly } else { SaveStatus::Idle };
        Self { delay, deadline: None, read_only, status }
    }

    /// Restart the debounce window from `now`.
    ///
    /// Returns the new status if it changed.
    pub fn schedule(&mut self, now: Instant) -> Option<SaveStatus> {
        if self.read_only {
            return self.set_status(SaveStatus::ReadOnly);
        }
        self.deadline = Some(now + self.delay);
        self.set_status(SaveStatus::Pending)
    }

    /// Consume the deadline if it has passed. A `true` return means the
    /// caller must persist now; status moves to `Saving`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.status = SaveStatus::Saving;
                true
            }
            _ => false,
        }
    }

    /// Consume the deadline regardless of time, e.g. when closing the board.
    pub fn take_pending(&mut self) -> bool {
        if self.deadline.take().is_some() {
            self.status = SaveStatus::Saving;
            return true;
        }
        false
    }

    /// Record the outcome of a save started by `take_due`/`take_pending`.
    ///
    /// If another change was scheduled while the save was in flight the
    /// status stays `Pending`.
    pub fn finish(&mut self, ok: bool) -> Option<SaveStatus> {
        if self.deadline.is_some() {
            return self.set_status(SaveStatus::Pending);
        }
        self.set_status(if ok { SaveStatus::Saved } else { SaveStatus::Failed })
    }

    /// Drop any pending save without persisting it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.status
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn set_status(&mut self, status: SaveStatus) -> Option<SaveStatus> {
        if self.status == status {
            return None;
        }
        self.status = status;
        Some(status)
    }
}
