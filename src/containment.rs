//! Containment and collision: keeps group membership truthful and group
//! regions mutually disjoint.
//!
//! DESIGN
//! ======
//! Collision is prospective: every incremental move/resize candidate for a
//! group is tested against all other groups before it is applied. A rejected
//! candidate leaves the scene untouched and reports the last accepted bounds
//! so the toolkit can snap the shape back while the user is still dragging.
//!
//! Membership is re-derived from geometry (card center inside group bounds)
//! on commit only; incremental updates never touch it. Because groups never
//! overlap at rest, at most one group can contain a card center once a
//! gesture has committed.

#[cfg(test)]
#[path = "containment_test.rs"]
mod containment_test;

use std::collections::BTreeSet;

use tracing::debug;

use crate::consts::MIN_GROUP_SIZE;
use crate::geometry::Rect;
use crate::scene::{EntityId, Scene};

/// Outcome of testing a group geometry candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The candidate is now the group's bounds.
    Accepted,
    /// The candidate was rejected; the group keeps these bounds.
    Reverted(Rect),
}

/// Cards whose owning group changed during a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    pub joined: Vec<EntityId>,
    pub left: Vec<EntityId>,
    /// Groups that lost a joined card to this group. Their cost is stale too.
    pub displaced: BTreeSet<EntityId>,
}

impl MembershipChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }

    /// Every card that changed, joined first.
    pub fn cards(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.joined.iter().chain(self.left.iter()).copied()
    }
}

/// A single card's owner before and after re-derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reassignment {
    pub card: EntityId,
    pub from: Option<EntityId>,
    pub to: Option<EntityId>,
}

/// Test a move candidate for `group_id` against every other group.
///
/// Returns `None` if `group_id` is not a group in the scene.
pub fn resolve_group_move(scene: &mut Scene, group_id: EntityId, candidate: Rect) -> Option<Resolution> {
    resolve_group_geometry(scene, group_id, candidate)
}

/// Test a resize candidate for `group_id`. Same policy as a move; candidates
/// smaller than the minimum group size are also rejected.
pub fn resolve_group_resize(scene: &mut Scene, group_id: EntityId, candidate: Rect) -> Option<Resolution> {
    if candidate.width < MIN_GROUP_SIZE || candidate.height < MIN_GROUP_SIZE {
        let current = scene.group(group_id)?.rect;
        debug!(%group_id, width = candidate.width, height = candidate.height, "resize below minimum; reverting");
        return Some(Resolution::Reverted(current));
    }
    resolve_group_geometry(scene, group_id, candidate)
}

fn resolve_group_geometry(scene: &mut Scene, group_id: EntityId, candidate: Rect) -> Option<Resolution> {
    let collides = scene
        .groups()
        .any(|other| other.id != group_id && other.rect.intersects(&candidate));
    let group = scene.group_mut(group_id)?;

    if collides {
        debug!(%group_id, "group geometry overlaps another group; reverting");
        return Some(Resolution::Reverted(group.rect));
    }

    group.rect = candidate;
    Some(Resolution::Accepted)
}

/// Re-test every card's center against `group_id`'s bounds.
///
/// Cards owned by the group but no longer inside it are unassigned; cards
/// inside it but not owned by it are assigned, and their previous owner is
/// reported as displaced. A missing group is treated as empty bounds, so
/// every card it owned leaves.
pub fn reconcile_membership(scene: &mut Scene, group_id: EntityId) -> MembershipChange {
    let bounds = scene.group(group_id).map(|g| g.rect);
    let mut change = MembershipChange::default();

    for card in scene.cards_mut() {
        let inside = bounds.is_some_and(|b| b.contains_point(card.center()));
        let owned = card.group == Some(group_id);
        if owned && !inside {
            card.group = None;
            change.left.push(card.id);
        } else if !owned && inside {
            change.displaced.extend(card.group);
            card.group = Some(group_id);
            change.joined.push(card.id);
        }
    }

    change
}

/// Re-derive one card's owner from the groups currently containing its
/// center. Returns the transition if the owner changed.
pub fn assign_card(scene: &mut Scene, card_id: EntityId) -> Option<Reassignment> {
    let center = scene.card(card_id)?.center();
    let containing = scene.groups_containing(center);
    if containing.len() > 1 {
        debug!(%card_id, count = containing.len(), "card center inside several groups; using topmost");
    }
    let to = containing.last().copied();

    let card = scene.card_mut(card_id)?;
    let from = card.group;
    if from == to {
        return None;
    }
    card.group = to;
    Some(Reassignment { card: card_id, from, to })
}

/// Re-derive the owner of every card in the scene.
pub fn assign_all_cards(scene: &mut Scene) -> Vec<Reassignment> {
    let ids: Vec<EntityId> = scene.cards().map(|c| c.id).collect();
    ids.into_iter()
        .filter_map(|id| assign_card(scene, id))
        .collect()
}

/// Unassign every card owned by `group_id`, returning their ids.
pub fn release_members(scene: &mut Scene, group_id: EntityId) -> Vec<EntityId> {
    scene
        .cards_mut()
        .filter(|c| c.group == Some(group_id))
        .map(|c| {
            c.group = None;
            c.id
        })
        .collect()
}
