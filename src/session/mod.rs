//! Board session controller, the engine's public surface.
//!
//! DESIGN
//! ======
//! One `BoardSession` owns everything about the open board: the scene, the
//! viewport, undo/redo history, cost-request sequencing and the autosave
//! deadline. Nothing else holds a mutable reference to any of it. The host
//! drives the session with `&mut self` calls (open/close, toolkit events,
//! undo/redo, periodic `tick`), so scene mutation is strictly sequential and
//! the only suspension points are backend calls.
//!
//! Every public operation returns the `Action`s the host must apply. Backend
//! failures never abort an operation; they surface as `Action::Status`,
//! `Action::RedirectToLogin` or a fallback to the board list.
//!
//! Submodules:
//! - `edit`: toolkit events and entity-level edits
//! - `sync`: backend calls, rollup, autosave flush

mod edit;
mod sync;


use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::api::{ApiError, BoardApi, BoardDocument};
use crate::autosave::{AutosaveCoordinator, SaveStatus};
use crate::config::EngineConfig;
use crate::consts::{CARD_HEIGHT, CARD_WIDTH, GRID_EXTENT, GRID_SPACING};
use crate::containment::assign_all_cards;
use crate::events::{Action, View};
use crate::geometry::{Point, Rect};
use crate::history::{HistoryManager, SceneSnapshot};
use crate::hit::{Hit, hit_test, hit_test_screen};
use crate::rollup::CostTracker;
use crate::scene::{AnnotationKind, BoardId, Entity, EntityId, Group, ResourceCard, Scene, grid_lines};
use crate::viewport::Viewport;
use sync::{Link, schedule_autosave};

/// Per-board state, alive between `open_board` and `close_board`.
struct OpenBoard {
    id: BoardId,
    name: String,
    scene: Scene,
    viewport: Viewport,
    read_only: bool,
    history: HistoryManager,
    costs: CostTracker,
    autosave: AutosaveCoordinator,
    gesture: Option<Gesture>,
}

/// An in-progress move or resize. `before` becomes the undo entry on commit.
struct Gesture {
    entity: EntityId,
    before: SceneSnapshot,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Undo,
    Redo,
}

pub struct BoardSession {
    link: Link,
    config: EngineConfig,
    view: View,
    board: Option<OpenBoard>,
}

impl BoardSession {
    #[must_use]
    pub fn new(api: Arc<dyn BoardApi>, config: EngineConfig) -> Self {
        Self { link: Link::new(api), config, view: View::List, board: None }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Load a board and make it the current scene. A board that no longer
    /// exists falls back to the board list without an error.
    pub async fn open_board(&mut self, board_id: BoardId) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        self.close_current(&mut actions).await;

        let result = self.link.api.fetch_board(board_id).await;
        let doc = match result {
            Ok(doc) => doc,
            Err(ApiError::NotFound(_)) => {
                info!(%board_id, "board not found; showing board list");
                self.show_list(&mut actions);
                return actions;
            }
            Err(e) => {
                self.link.settle("open board", Err::<(), _>(e), &mut actions);
                self.view = View::List;
                if !self.link.blocked() {
                    actions.push(Action::Navigate { view: View::List });
                }
                return actions;
            }
        };

        let read_only = self.config.read_only || doc.read_only;
        let name = doc.name.clone();
        let (scene, viewport) = scene_from_document(doc);
        let mut board = OpenBoard {
            id: board_id,
            name,
            scene,
            viewport,
            read_only,
            history: HistoryManager::new(self.config.max_history),
            costs: CostTracker::new(),
            autosave: AutosaveCoordinator::new(self.config.autosave_delay, read_only),
            gesture: None,
        };

        let view = View::Board { board_id };
        actions.push(Action::Navigate { view });
        actions.push(Action::SceneReplaced);
        if read_only {
            actions.push(Action::SaveStatusChanged { status: SaveStatus::ReadOnly });
        }

        let corrections = assign_all_cards(&mut board.scene);
        if !corrections.is_empty() {
            info!(%board_id, count = corrections.len(), "correcting stale group membership");
        }
        for reassignment in &corrections {
            self.link.persist_placement(&board, reassignment.card, &mut actions).await;
        }
        self.link.rollup_all(&mut board, &mut actions).await;

        info!(%board_id, entities = board.scene.len(), read_only, "board opened");
        self.view = view;
        self.board = Some(board);
        actions
    }

    /// Flush any pending autosave and return to the board list.
    pub async fn close_board(&mut self) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        self.close_current(&mut actions).await;
        self.show_list(&mut actions);
        actions
    }

    async fn close_current(&mut self, actions: &mut Vec<Action>) {
        let Some(mut board) = self.board.take() else {
            return;
        };
        if board.autosave.take_pending() {
            self.link.save_layout(&mut board, actions).await;
        }
        info!(board_id = %board.id, "board closed");
    }

    fn show_list(&mut self, actions: &mut Vec<Action>) {
        self.view = View::List;
        actions.push(Action::Navigate { view: View::List });
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    pub async fn undo(&mut self) -> Vec<Action> {
        self.step_history(Step::Undo).await
    }

    pub async fn redo(&mut self) -> Vec<Action> {
        self.step_history(Step::Redo).await
    }

    async fn step_history(&mut self, step: Step) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        let Some(board) = self.board.as_mut() else {
            return actions;
        };

        board.gesture = None;
        let current = SceneSnapshot::capture(&board.scene, board.viewport);
        let target = match step {
            Step::Undo => board.history.undo(current),
            Step::Redo => board.history.redo(current),
        };
        let Some(target) = target else {
            debug!(?step, "history empty");
            return actions;
        };

        restore(board, target);
        actions.push(Action::SceneReplaced);
        self.link.rollup_all(board, &mut actions).await;
        board.history.finish_restore();
        schedule_autosave(board, &mut actions);
        actions
    }

    // =========================================================================
    // VIEW STATE
    // =========================================================================

    /// Pan/zoom changed. Persisted by autosave; not an undoable action.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(board) = self.board.as_mut() else {
            return actions;
        };
        board.viewport = viewport.clamped();
        schedule_autosave(board, &mut actions);
        actions
    }

    /// Show or hide the alignment grid. Grid lines are never persisted.
    pub fn set_grid_visible(&mut self, visible: bool) -> Vec<Action> {
        let Some(board) = self.board.as_mut() else {
            return Vec::new();
        };
        if visible == board.scene.has_grid() {
            return Vec::new();
        }
        if visible {
            board.scene.set_grid(grid_lines(GRID_SPACING, GRID_EXTENT));
        } else {
            board.scene.clear_grid();
        }
        vec![Action::SceneReplaced]
    }

    // =========================================================================
    // AUTOSAVE
    // =========================================================================

    /// Fire the autosave if its debounce window has closed.
    pub async fn tick(&mut self) -> Vec<Action> {
        self.tick_at(Instant::now()).await
    }

    pub async fn tick_at(&mut self, now: Instant) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        let Some(board) = self.board.as_mut() else {
            return actions;
        };
        if board.autosave.take_due(now) {
            self.link.save_layout(board, &mut actions).await;
        }
        actions
    }

    /// When the host should next call [`tick`](Self::tick).
    #[must_use]
    pub fn next_autosave(&self) -> Option<Instant> {
        self.board.as_ref().and_then(|b| b.autosave.deadline())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub fn board_id(&self) -> Option<BoardId> {
        self.board.as_ref().map(|b| b.id)
    }

    #[must_use]
    pub fn board_name(&self) -> Option<&str> {
        self.board.as_ref().map(|b| b.name.as_str())
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.board.as_ref().map(|b| &b.scene)
    }

    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.board.as_ref().map(|b| b.viewport)
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.board.as_ref().is_some_and(|b| b.read_only)
    }

    #[must_use]
    pub fn save_status(&self) -> Option<SaveStatus> {
        self.board.as_ref().map(|b| b.autosave.status())
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.board.as_ref().is_some_and(|b| b.history.can_undo())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.board.as_ref().is_some_and(|b| b.history.can_redo())
    }

    /// Entity under a world-space point.
    #[must_use]
    pub fn hit_test(&self, world: Point) -> Option<Hit> {
        self.board.as_ref().and_then(|b| hit_test(&b.scene, world))
    }

    /// Entity under a screen-space point, through the current viewport.
    #[must_use]
    pub fn hit_test_screen(&self, screen: Point) -> Option<Hit> {
        self.board.as_ref().and_then(|b| hit_test_screen(&b.scene, &b.viewport, screen))
    }
}

// =============================================================================
// HYDRATION / RESTORE
// =============================================================================

/// Build a scene from a loaded board. Groups are drawn first, then cards,
/// then annotations. Card ownership comes from the backend group id and is
/// re-derived from geometry by the caller.
fn scene_from_document(doc: BoardDocument) -> (Scene, Viewport) {
    let mut scene = Scene::new();
    let mut by_remote = HashMap::new();

    for record in doc.groups {
        let mut group = Group::new(record.name, record.color, record.rect);
        group.remote_id = Some(record.id);
        by_remote.insert(record.id, group.id);
        scene.insert(Entity::Group(group));
    }

    for record in doc.placements {
        let rect = Rect::new(record.position.x, record.position.y, CARD_WIDTH, CARD_HEIGHT);
        let mut card = ResourceCard::new(record.resource, rect);
        card.placement_id = Some(record.id);
        card.group = record.group_id.and_then(|remote| by_remote.get(&remote).copied());
        scene.insert(Entity::ResourceCard(card));
    }

    for annotation in doc.annotations {
        if annotation.kind == AnnotationKind::GridLine {
            continue;
        }
        scene.insert(Entity::Annotation(annotation));
    }

    (scene, doc.viewport.unwrap_or_default().clamped())
}

/// Replace the live scene with a snapshot. Entity behavior follows from the
/// variant, so nothing has to be re-attached; only backend-derived display
/// state (costs, badges) is recomputed by the caller.
fn restore(board: &mut OpenBoard, snapshot: SceneSnapshot) {
    let grid_visible = board.scene.has_grid();
    board.scene.load(snapshot.entities);
    if grid_visible {
        board.scene.set_grid(grid_lines(GRID_SPACING, GRID_EXTENT));
    }
    board.viewport = snapshot.viewport.clamped();
    board.costs.clear();
}
