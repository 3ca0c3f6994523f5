//! Scene model: placed entities and the ordered store that owns them.
//!
//! This module defines what is on the board (`Entity` and its three
//! variants), the identifiers that link entities to backend records, and the
//! `Scene` store. Behaviour that depends on the variant (collision for
//! groups, membership for cards, nothing for annotations) is matched
//! exhaustively at each call site, so a rehydrated entity behaves the same as
//! the one that was snapshotted.
//!
//! Derived display state (group cost, multiplicity badge) lives on the
//! entities for rendering but is never serialized: snapshots and autosave
//! payloads only carry what the user placed.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect};

/// Scene-local identifier for any entity. Stable across undo/redo.
pub type EntityId = Uuid;

/// Backend identifier of a board.
pub type BoardId = Uuid;

/// Backend identifier of a persisted group.
pub type GroupId = Uuid;

/// Backend identifier of one resource placement.
pub type PlacementId = Uuid;

/// Cloud resource identifier (ARN, resource URI, etc.). Shared by every
/// placement of the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cloud resource a card points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub provider: String,
}

/// Backend-computed cost rollup of a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupCost {
    pub calculated_cost: f64,
    pub resource_count: u32,
}

/// One placement of a cloud resource on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCard {
    pub id: EntityId,
    /// Backend placement id; `None` until the create call returns.
    pub placement_id: Option<PlacementId>,
    pub resource: ResourceRef,
    /// Scene id of the group whose bounds contain this card's center.
    pub group: Option<EntityId>,
    pub rect: Rect,
    /// Shown when the same resource is placed more than once.
    #[serde(skip)]
    pub multiplicity_badge: bool,
}

impl ResourceCard {
    /// A fresh, unpersisted, unassigned placement of `resource`.
    #[must_use]
    pub fn new(resource: ResourceRef, rect: Rect) -> Self {
        Self { id: Uuid::new_v4(), placement_id: None, resource, group: None, rect, multiplicity_badge: false }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        self.rect.center()
    }
}

/// A named, colored grouping region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    /// Backend group id; `None` until the create call returns.
    pub remote_id: Option<GroupId>,
    pub name: String,
    pub color: String,
    pub rect: Rect,
    /// Last cost accepted from the backend.
    #[serde(skip)]
    pub cost: Option<GroupCost>,
}

impl Group {
    /// A fresh, unpersisted group.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>, rect: Rect) -> Self {
        Self { id: Uuid::new_v4(), remote_id: None, name: name.into(), color: color.into(), rect, cost: None }
    }
}

/// Kind of free-form annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Text,
    Rect,
    /// Alignment grid line. Transient: never snapshotted or persisted.
    GridLine,
}

/// Free-form text or rectangle with no backend identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    pub kind: AnnotationKind,
    pub rect: Rect,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub color: String,
}

impl Annotation {
    #[must_use]
    pub fn new(kind: AnnotationKind, rect: Rect, text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), kind, rect, text: text.into(), color: String::new() }
    }

    /// A thin transient line used to draw the alignment grid.
    #[must_use]
    pub fn grid_line(rect: Rect) -> Self {
        Self { id: Uuid::new_v4(), kind: AnnotationKind::GridLine, rect, text: String::new(), color: String::new() }
    }
}

/// Any placed visual item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    ResourceCard(ResourceCard),
    Group(Group),
    Annotation(Annotation),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::ResourceCard(card) => card.id,
            Self::Group(group) => group.id,
            Self::Annotation(annotation) => annotation.id,
        }
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        match self {
            Self::ResourceCard(card) => card.rect,
            Self::Group(group) => group.rect,
            Self::Annotation(annotation) => annotation.rect,
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        match self {
            Self::ResourceCard(card) => card.rect = rect,
            Self::Group(group) => group.rect = rect,
            Self::Annotation(annotation) => annotation.rect = rect,
        }
    }

    /// Visual aids that exist only for the current view.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Annotation(Annotation { kind: AnnotationKind::GridLine, .. }))
    }

    /// Copy with backend-derived display state cleared.
    #[must_use]
    pub fn without_derived(&self) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Self::ResourceCard(card) => card.multiplicity_badge = false,
            Self::Group(group) => group.cost = None,
            Self::Annotation(_) => {}
        }
        copy
    }
}

/// The ordered collection of everything on one open board.
///
/// Order is draw order: later entities are drawn above earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entities: Vec<Entity>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity, or replace in place if one with the same id exists.
    pub fn insert(&mut self, entity: Entity) {
        let id = entity.id();
        if let Some(slot) = self.entities.iter_mut().find(|e| e.id() == id) {
            *slot = entity;
        } else {
            self.entities.push(entity);
        }
    }

    /// Remove an entity by id, returning it if it was present.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id() == id)?;
        Some(self.entities.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn group(&self, id: EntityId) -> Option<&Group> {
        match self.get(id) {
            Some(Entity::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn group_mut(&mut self, id: EntityId) -> Option<&mut Group> {
        match self.get_mut(id) {
            Some(Entity::Group(group)) => Some(group),
            _ => None,
        }
    }

    #[must_use]
    pub fn card(&self, id: EntityId) -> Option<&ResourceCard> {
        match self.get(id) {
            Some(Entity::ResourceCard(card)) => Some(card),
            _ => None,
        }
    }

    pub fn card_mut(&mut self, id: EntityId) -> Option<&mut ResourceCard> {
        match self.get_mut(id) {
            Some(Entity::ResourceCard(card)) => Some(card),
            _ => None,
        }
    }

    /// Find the group that was persisted under `remote_id`.
    #[must_use]
    pub fn group_by_remote(&self, remote_id: GroupId) -> Option<&Group> {
        self.groups().find(|g| g.remote_id == Some(remote_id))
    }

    /// Every entity in draw order, transient ones included.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Group(group) => Some(group),
            _ => None,
        })
    }

    pub fn cards(&self) -> impl Iterator<Item = &ResourceCard> {
        self.entities.iter().filter_map(|e| match e {
            Entity::ResourceCard(card) => Some(card),
            _ => None,
        })
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut ResourceCard> {
        self.entities.iter_mut().filter_map(|e| match e {
            Entity::ResourceCard(card) => Some(card),
            _ => None,
        })
    }

    /// Non-transient annotations.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Annotation(a) if a.kind != AnnotationKind::GridLine => Some(a),
            _ => None,
        })
    }

    /// All placements of one resource.
    pub fn placements_of<'a>(&'a self, resource_id: &'a ResourceId) -> impl Iterator<Item = &'a ResourceCard> + 'a {
        self.cards().filter(move |c| &c.resource.id == resource_id)
    }

    /// Distinct resource ids with at least one placement.
    #[must_use]
    pub fn resource_ids(&self) -> BTreeSet<ResourceId> {
        self.cards().map(|c| c.resource.id.clone()).collect()
    }

    /// Bounds of every group except `except`.
    #[must_use]
    pub fn group_rects_except(&self, except: Option<EntityId>) -> Vec<Rect> {
        self.groups()
            .filter(|g| Some(g.id) != except)
            .map(|g| g.rect)
            .collect()
    }

    /// Groups whose bounds contain `point`, in draw order.
    #[must_use]
    pub fn groups_containing(&self, point: Point) -> Vec<EntityId> {
        self.groups()
            .filter(|g| g.rect.contains_point(point))
            .map(|g| g.id)
            .collect()
    }

    /// Replace every entity, e.g. when hydrating or restoring a snapshot.
    pub fn load(&mut self, entities: Vec<Entity>) {
        self.entities = entities;
    }

    /// Persistent entities in draw order with derived display state cleared.
    #[must_use]
    pub fn snapshot_entities(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|e| !e.is_transient())
            .map(Entity::without_derived)
            .collect()
    }

    /// Replace the alignment grid with `lines`, drawn beneath everything else.
    pub fn set_grid(&mut self, lines: Vec<Annotation>) {
        self.clear_grid();
        let mut entities: Vec<Entity> = lines.into_iter().map(Entity::Annotation).collect();
        entities.append(&mut self.entities);
        self.entities = entities;
    }

    /// Drop every transient entity.
    pub fn clear_grid(&mut self) {
        self.entities.retain(|e| !e.is_transient());
    }

    #[must_use]
    pub fn has_grid(&self) -> bool {
        self.entities.iter().any(Entity::is_transient)
    }

    /// Number of entities currently in the scene, transient ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the scene contains no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Vertical and horizontal grid lines every `spacing` units across `[-extent, extent]`.
#[must_use]
pub fn grid_lines(spacing: f64, extent: f64) -> Vec<Annotation> {
    if spacing <= 0.0 || extent <= 0.0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut offset = -extent;
    while offset <= extent {
        lines.push(Annotation::grid_line(Rect::new(offset, -extent, 0.0, extent * 2.0)));
        lines.push(Annotation::grid_line(Rect::new(-extent, offset, extent * 2.0, 0.0)));
        offset += spacing;
    }
    lines
}
