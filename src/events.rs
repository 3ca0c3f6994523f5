//! Toolkit events in, host actions out.
//!
//! The rendering toolkit reports direct manipulation as `SceneEvent`s; the
//! session answers with a list of `Action`s the host applies (snap a shape
//! back, redraw a badge, show a status line, navigate).

use serde::{Deserialize, Serialize};

use crate::autosave::SaveStatus;
use crate::geometry::{Point, Rect};
use crate::scene::{Annotation, BoardId, EntityId, GroupCost, ResourceRef};

/// Discrete manipulation event from the rendering toolkit. Geometry is the
/// entity's current world-space bounds as the toolkit sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SceneEvent {
    MoveStart { id: EntityId },
    MoveUpdate { id: EntityId, rect: Rect },
    MoveCommit { id: EntityId, rect: Rect },
    ResizeUpdate { id: EntityId, rect: Rect },
    ResizeCommit { id: EntityId, rect: Rect },
    Create { draft: EntityDraft },
    Delete { id: EntityId },
}

/// Something the user asked to add to the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDraft {
    Group { name: String, color: Option<String>, rect: Rect },
    /// Drop a resource card with its top-left corner at `position`.
    Resource { resource: ResourceRef, position: Point },
    Annotation { annotation: Annotation },
}

/// Which screen the surrounding page should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    List,
    Board { board_id: BoardId },
}

/// Instruction for the host after the engine handled an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Snap the shape back to `rect`; the candidate geometry was rejected.
    Revert { id: EntityId, rect: Rect },
    EntityAdded { id: EntityId },
    EntityRemoved { id: EntityId },
    /// Entity geometry changed by the engine (e.g. placement adjusted).
    EntityMoved { id: EntityId, rect: Rect },
    BadgeChanged { id: EntityId, visible: bool },
    CostChanged { group: EntityId, cost: GroupCost },
    SaveStatusChanged { status: SaveStatus },
    /// Transient user-visible status line, e.g. a persistence failure.
    Status { message: String },
    /// The whole scene was replaced (open, undo, redo); redraw everything.
    SceneReplaced,
    Navigate { view: View },
    RedirectToLogin,
}

impl Action {
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status { message: message.into() }
    }
}
