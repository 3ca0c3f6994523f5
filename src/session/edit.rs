//! Toolkit events and entity-level edits.
//!
//! Ordering within one gesture: geometry is resolved on every update,
//! membership is reconciled on commit, the resulting backend writes are
//! issued, costs and badges are refreshed, and only then is the pre-gesture
//! snapshot pushed onto history.
//!
//! Creation is optimistic: the entity is in the scene before the backend
//! confirms it, and removed again if the create call fails. The pre-create
//! snapshot is recorded only once the create has succeeded, so a failed
//! create leaves both history stacks as they were. Update and delete
//! failures are reported but not rolled back.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use uuid::Uuid;

use super::sync::{remote_group, resources_of, schedule_autosave};
use super::{BoardSession, Gesture, OpenBoard};
use crate::api::{GroupDraft, PlacementDraft};
use crate::consts::{CARD_HEIGHT, CARD_WIDTH, CLONE_OFFSET, DEFAULT_GROUP_COLOR, MIN_GROUP_SIZE, PASTE_OFFSET};
use crate::containment::{
    Resolution, assign_card, reconcile_membership, release_members, resolve_group_move, resolve_group_resize,
};
use crate::events::{Action, EntityDraft, SceneEvent};
use crate::geometry::{Point, Rect, find_non_overlapping_position};
use crate::history::SceneSnapshot;
use crate::scene::{Annotation, AnnotationKind, Entity, EntityId, Group, ResourceCard, ResourceRef, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Manipulation {
    Move,
    Resize,
}

fn resolve(kind: Manipulation, scene: &mut Scene, id: EntityId, rect: Rect) -> Option<Resolution> {
    match kind {
        Manipulation::Move => resolve_group_move(scene, id, rect),
        Manipulation::Resize => resolve_group_resize(scene, id, rect),
    }
}

fn capture(board: &OpenBoard) -> SceneSnapshot {
    SceneSnapshot::capture(&board.scene, board.viewport)
}

impl BoardSession {
    // =========================================================================
    // EVENT DISPATCH
    // =========================================================================

    /// Apply one toolkit event to the open board.
    pub async fn handle(&mut self, event: SceneEvent) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        if self.board.is_none() {
            debug!(?event, "event with no open board ignored");
            return actions;
        }

        match event {
            SceneEvent::MoveStart { id } => self.begin_gesture(id),
            SceneEvent::MoveUpdate { id, rect } => self.update_geometry(id, rect, Manipulation::Move, &mut actions),
            SceneEvent::ResizeUpdate { id, rect } => {
                self.update_geometry(id, rect, Manipulation::Resize, &mut actions);
            }
            SceneEvent::MoveCommit { id, rect } => {
                self.commit_geometry(id, rect, Manipulation::Move, &mut actions).await;
            }
            SceneEvent::ResizeCommit { id, rect } => {
                self.commit_geometry(id, rect, Manipulation::Resize, &mut actions).await;
            }
            SceneEvent::Create { draft } => self.create(draft, &mut actions).await,
            SceneEvent::Delete { id } => self.delete(id, &mut actions).await,
        }
        actions
    }

    fn begin_gesture(&mut self, id: EntityId) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        if board.scene.get(id).is_none() {
            debug!(%id, "move start for unknown entity");
            return;
        }
        board.gesture = Some(Gesture { entity: id, before: capture(board) });
    }

    /// Live feedback while dragging. Group candidates that would overlap
    /// another group are rejected immediately.
    fn update_geometry(&mut self, id: EntityId, rect: Rect, kind: Manipulation, actions: &mut Vec<Action>) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(entity) = board.scene.get(id) else {
            debug!(%id, "geometry update for unknown entity");
            return;
        };
        let current = entity.rect();
        let variant = Variant::of(entity);

        if board.gesture.as_ref().is_none_or(|g| g.entity != id) {
            board.gesture = Some(Gesture { entity: id, before: capture(board) });
        }

        match variant {
            Variant::Group => {
                if let Some(Resolution::Reverted(rect)) = resolve(kind, &mut board.scene, id, rect) {
                    actions.push(Action::Revert { id, rect });
                }
            }
            Variant::Card if kind == Manipulation::Resize => {
                actions.push(Action::Revert { id, rect: current });
            }
            Variant::Card | Variant::Annotation => {
                if let Some(entity) = board.scene.get_mut(id) {
                    entity.set_rect(card_or_free_rect(variant, current, rect));
                }
            }
        }
    }

    /// End of a move or resize.
    async fn commit_geometry(&mut self, id: EntityId, rect: Rect, kind: Manipulation, actions: &mut Vec<Action>) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let before = match board.gesture.take() {
            Some(gesture) if gesture.entity == id => gesture.before,
            _ => capture(board),
        };
        let Some(entity) = board.scene.get(id) else {
            debug!(%id, "commit for unknown entity");
            return;
        };
        let variant = Variant::of(entity);
        let current = entity.rect();
        let origin = before.entities.iter().find(|e| e.id() == id).map(Entity::rect);

        match variant {
            Variant::Group => {
                if let Some(Resolution::Reverted(rect)) = resolve(kind, &mut board.scene, id, rect) {
                    actions.push(Action::Revert { id, rect });
                }
                let Some(settled) = board.scene.group(id).map(|g| g.rect) else {
                    return;
                };
                if origin == Some(settled) {
                    debug!(%id, "group gesture ended where it started");
                    return;
                }

                let change = reconcile_membership(&mut board.scene, id);
                self.link.persist_group(board, id, actions).await;
                for card in change.cards() {
                    self.link.persist_placement(board, card, actions).await;
                }
                let resources = resources_of(&board.scene, change.cards());
                let mut extra = change.displaced;
                extra.insert(id);
                self.link.rollup(board, &resources, &extra, actions).await;
            }
            Variant::Card => {
                let settled = current.moved_to(rect.x, rect.y);
                if settled != rect {
                    actions.push(Action::Revert { id, rect: settled });
                }
                if let Some(card) = board.scene.card_mut(id) {
                    card.rect = settled;
                }
                if origin == Some(settled) {
                    return;
                }

                let reassignment = assign_card(&mut board.scene, id);
                self.link.persist_placement(board, id, actions).await;
                if let Some(reassignment) = reassignment {
                    let resources = resources_of(&board.scene, [id]);
                    let extra: BTreeSet<EntityId> = reassignment.from.into_iter().collect();
                    self.link.rollup(board, &resources, &extra, actions).await;
                }
            }
            Variant::Annotation => {
                if let Some(entity) = board.scene.get_mut(id) {
                    entity.set_rect(rect);
                }
                if origin == Some(rect) {
                    return;
                }
            }
        }

        board.history.record(before);
        schedule_autosave(board, actions);
    }

    async fn create(&mut self, draft: EntityDraft, actions: &mut Vec<Action>) {
        match draft {
            EntityDraft::Group { name, color, rect } => {
                self.create_group_inner(name, color, rect, actions).await;
            }
            EntityDraft::Resource { resource, position } => {
                self.place_card_inner(resource, position, true, actions).await;
            }
            EntityDraft::Annotation { annotation } => {
                self.add_annotation_inner(annotation, actions);
            }
        }
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    /// Draw a new group. The requested position is shifted diagonally until
    /// it clears every existing group (best effort).
    pub async fn create_group(&mut self, name: impl Into<String>, color: Option<String>, rect: Rect) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        self.create_group_inner(name.into(), color, rect, &mut actions).await;
        actions
    }

    /// Drop a resource card with its top-left corner near `position`.
    pub async fn place_resource(&mut self, resource: ResourceRef, position: Point) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        self.place_card_inner(resource, position, true, &mut actions).await;
        actions
    }

    /// Place another card for the same resource at a fixed diagonal offset.
    pub async fn clone_placement(&mut self, card_id: EntityId) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        let source = self.board.as_ref().and_then(|b| b.scene.card(card_id)).map(|c| (c.resource.clone(), c.rect));
        let Some((resource, rect)) = source else {
            debug!(%card_id, "clone of unknown card");
            return actions;
        };
        let position = rect.translated(CLONE_OFFSET, CLONE_OFFSET).origin();
        self.place_card_inner(resource, position, false, &mut actions).await;
        actions
    }

    /// Re-create clipboard entities, offset from their originals, as a
    /// single undoable action.
    pub async fn paste(&mut self, items: Vec<Entity>) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        let Some(board) = self.board.as_mut() else {
            return actions;
        };
        let before = capture(board);
        board.history.begin_batch();

        let mut created = 0_usize;
        for item in items {
            let added = match item {
                Entity::Group(group) => {
                    let rect = group.rect.translated(PASTE_OFFSET, PASTE_OFFSET);
                    self.create_group_inner(group.name, Some(group.color), rect, &mut actions).await
                }
                Entity::ResourceCard(card) => {
                    let position = card.rect.translated(PASTE_OFFSET, PASTE_OFFSET).origin();
                    self.place_card_inner(card.resource, position, false, &mut actions).await
                }
                Entity::Annotation(annotation) => {
                    let rect = annotation.rect.translated(PASTE_OFFSET, PASTE_OFFSET);
                    self.add_annotation_inner(Annotation { rect, ..annotation }, &mut actions)
                }
            };
            if added.is_some() {
                created += 1;
            }
        }

        if let Some(board) = self.board.as_mut() {
            board.history.end_batch();
            if created > 0 {
                board.history.record(before);
            }
        }
        actions
    }

    async fn create_group_inner(
        &mut self,
        name: String,
        color: Option<String>,
        rect: Rect,
        actions: &mut Vec<Action>,
    ) -> Option<EntityId> {
        let (step, attempts) = (self.config.placement_step, self.config.placement_attempts);
        let board = self.board.as_mut()?;
        let before = capture(board);

        let width = rect.width.max(MIN_GROUP_SIZE);
        let height = rect.height.max(MIN_GROUP_SIZE);
        let obstacles = board.scene.group_rects_except(None);
        let spot = find_non_overlapping_position(rect.x, rect.y, width, height, &obstacles, step, attempts);
        let group = Group::new(
            name,
            color.unwrap_or_else(|| DEFAULT_GROUP_COLOR.to_string()),
            Rect::new(spot.x, spot.y, width, height),
        );
        if obstacles.iter().any(|o| o.intersects(&group.rect)) {
            warn!(group_id = %group.id, "no free spot found for group; placed best effort");
        }

        let id = group.id;
        let placed = group.rect;
        let draft = GroupDraft { name: group.name.clone(), color: group.color.clone(), rect: placed };
        board.scene.insert(Entity::Group(group));
        actions.push(Action::EntityAdded { id });
        if placed != rect {
            actions.push(Action::EntityMoved { id, rect: placed });
        }
        let change = reconcile_membership(&mut board.scene, id);

        if !board.read_only {
            let remote_id = if self.link.blocked() {
                None
            } else {
                let result = self.link.api.create_group(board.id, &draft).await;
                self.link.settle("create group", result, actions)
            };
            let Some(remote_id) = remote_id else {
                roll_back_create(board, id, actions);
                return None;
            };
            if let Some(group) = board.scene.group_mut(id) {
                group.remote_id = Some(remote_id);
            }
            for card in change.cards() {
                self.link.persist_placement(board, card, actions).await;
            }
        }

        board.history.record(before);
        let resources = resources_of(&board.scene, change.cards());
        let mut extra = change.displaced;
        extra.insert(id);
        self.link.rollup(board, &resources, &extra, actions).await;
        schedule_autosave(board, actions);
        Some(id)
    }

    async fn place_card_inner(
        &mut self,
        resource: ResourceRef,
        position: Point,
        search: bool,
        actions: &mut Vec<Action>,
    ) -> Option<EntityId> {
        let (step, attempts) = (self.config.placement_step, self.config.placement_attempts);
        let board = self.board.as_mut()?;
        let before = capture(board);

        let origin = if search {
            let obstacles: Vec<Rect> = board.scene.cards().map(|c| c.rect).collect();
            find_non_overlapping_position(position.x, position.y, CARD_WIDTH, CARD_HEIGHT, &obstacles, step, attempts)
        } else {
            position
        };
        let card = ResourceCard::new(resource, Rect::new(origin.x, origin.y, CARD_WIDTH, CARD_HEIGHT));
        let id = card.id;
        let resource_id = card.resource.id.clone();
        let placed = card.rect;
        board.scene.insert(Entity::ResourceCard(card));
        actions.push(Action::EntityAdded { id });
        if placed.origin() != position {
            actions.push(Action::EntityMoved { id, rect: placed });
        }
        assign_card(&mut board.scene, id);

        if !board.read_only {
            let owner = board.scene.card(id).and_then(|c| c.group);
            let draft = PlacementDraft {
                resource_id: resource_id.clone(),
                position: origin,
                group_id: remote_group(&board.scene, owner),
            };
            let placement_id = if self.link.blocked() {
                None
            } else {
                let result = self.link.api.create_placement(board.id, &draft).await;
                self.link.settle("place resource", result, actions)
            };
            let Some(placement_id) = placement_id else {
                roll_back_create(board, id, actions);
                return None;
            };
            if let Some(card) = board.scene.card_mut(id) {
                card.placement_id = Some(placement_id);
            }
        }

        board.history.record(before);
        self.link.rollup(board, &BTreeSet::from([resource_id]), &BTreeSet::new(), actions).await;
        schedule_autosave(board, actions);
        Some(id)
    }

    fn add_annotation_inner(&mut self, annotation: Annotation, actions: &mut Vec<Action>) -> Option<EntityId> {
        let board = self.board.as_mut()?;
        if annotation.kind == AnnotationKind::GridLine {
            debug!("grid lines are view-only; not added");
            return None;
        }
        let before = capture(board);
        board.history.record(before);
        let id = Uuid::new_v4();
        board.scene.insert(Entity::Annotation(Annotation { id, ..annotation }));
        actions.push(Action::EntityAdded { id });
        schedule_autosave(board, actions);
        Some(id)
    }

    // =========================================================================
    // UPDATE / DELETE
    // =========================================================================

    /// Rename and/or recolor a group; persisted immediately.
    pub async fn update_group_details(
        &mut self,
        group_id: EntityId,
        name: Option<String>,
        color: Option<String>,
    ) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        let Some(board) = self.board.as_mut() else {
            return actions;
        };
        if board.scene.group(group_id).is_none() {
            debug!(%group_id, "details update for unknown group");
            return actions;
        }

        let before = capture(board);
        board.history.record(before);
        if let Some(group) = board.scene.group_mut(group_id) {
            if let Some(name) = name {
                group.name = name;
            }
            if let Some(color) = color {
                group.color = color;
            }
        }
        self.link.persist_group(board, group_id, &mut actions).await;
        schedule_autosave(board, &mut actions);
        actions
    }

    /// Remove any entity. Deleting a group releases the cards it owned.
    pub async fn delete_entity(&mut self, id: EntityId) -> Vec<Action> {
        self.link.begin_cycle();
        let mut actions = Vec::new();
        self.delete(id, &mut actions).await;
        actions
    }

    async fn delete(&mut self, id: EntityId, actions: &mut Vec<Action>) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        if board.scene.get(id).is_none() {
            debug!(%id, "delete of unknown entity");
            return;
        }

        let before = capture(board);
        board.history.record(before);
        if board.gesture.as_ref().is_some_and(|g| g.entity == id) {
            board.gesture = None;
        }
        let Some(entity) = board.scene.remove(id) else {
            return;
        };
        actions.push(Action::EntityRemoved { id });
        let persist = !board.read_only;

        match entity {
            Entity::ResourceCard(card) => {
                if let (true, Some(placement_id)) = (persist && !self.link.blocked(), card.placement_id) {
                    let result = self.link.api.delete_placement(placement_id).await;
                    self.link.settle("remove placement", result, actions);
                }
                let extra: BTreeSet<EntityId> = card.group.into_iter().collect();
                self.link.rollup(board, &BTreeSet::from([card.resource.id]), &extra, actions).await;
            }
            Entity::Group(group) => {
                let released = release_members(&mut board.scene, id);
                board.costs.forget(id);
                for card in released {
                    self.link.persist_placement(board, card, actions).await;
                }
                if let (true, Some(remote_id)) = (persist && !self.link.blocked(), group.remote_id) {
                    let result = self.link.api.delete_group(remote_id).await;
                    self.link.settle("delete group", result, actions);
                }
            }
            Entity::Annotation(_) => {}
        }

        schedule_autosave(board, actions);
    }
}

/// Variant tag, copied out so the scene borrow can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Group,
    Card,
    Annotation,
}

impl Variant {
    fn of(entity: &Entity) -> Self {
        match entity {
            Entity::Group(_) => Self::Group,
            Entity::ResourceCard(_) => Self::Card,
            Entity::Annotation(_) => Self::Annotation,
        }
    }
}

/// Cards keep their fixed size whatever the toolkit reports.
fn card_or_free_rect(variant: Variant, current: Rect, rect: Rect) -> Rect {
    match variant {
        Variant::Card => current.moved_to(rect.x, rect.y),
        Variant::Group | Variant::Annotation => rect,
    }
}

/// Undo an optimistic insert whose backend create failed. History was not
/// touched yet, so the redo stack survives. Cards the new group had claimed
/// fall back to whichever group still contains them.
fn roll_back_create(board: &mut OpenBoard, id: EntityId, actions: &mut Vec<Action>) {
    warn!(%id, "create failed; removing optimistic entity");
    board.scene.remove(id);
    for card in release_members(&mut board.scene, id) {
        assign_card(&mut board.scene, card);
    }
    actions.push(Action::EntityRemoved { id });
}
