//! Cost rollup sequencing and multiplicity badges.
//!
//! DESIGN
//! ======
//! Group cost is always the backend's number; this module only decides
//! *which* groups need a refresh and *whether* a response may be applied.
//! Refreshes are sequenced per group with monotonically increasing tickets:
//! a response is applied only if its ticket is the most recently issued one
//! for that group, so a slow stale response can never overwrite a fresher
//! value.
//!
//! Today every refresh runs inside a `&mut` session call and is awaited
//! before the next one is issued, so `accept` always succeeds. The ticket
//! exists for a detached refresh (spawned, or driven from a second handle)
//! where responses can arrive out of order.
//!
//! Multiplicity badges are purely local: a resource placed more than once
//! shows the badge on every placement.

#[cfg(test)]
#[path = "rollup_test.rs"]
mod rollup_test;

use std::collections::{BTreeSet, HashMap};

use crate::scene::{EntityId, ResourceId, Scene};

/// Every group currently containing a placement of `resource_id`, plus
/// `extra` (a group the resource just left, which must still be refreshed).
#[must_use]
pub fn affected_groups(scene: &Scene, resource_id: &ResourceId, extra: Option<EntityId>) -> BTreeSet<EntityId> {
    let mut groups: BTreeSet<EntityId> = scene
        .placements_of(resource_id)
        .filter_map(|card| card.group)
        .collect();
    groups.extend(extra);
    groups
}

/// Recompute the multiplicity badge on every placement of `resource_id`.
///
/// Returns the cards whose badge visibility changed, with the new value.
pub fn refresh_badges(scene: &mut Scene, resource_id: &ResourceId) -> Vec<(EntityId, bool)> {
    let visible = scene.placements_of(resource_id).count() > 1;
    scene
        .cards_mut()
        .filter(|card| &card.resource.id == resource_id && card.multiplicity_badge != visible)
        .map(|card| {
            card.multiplicity_badge = visible;
            (card.id, visible)
        })
        .collect()
}

/// Recompute badges for every resource on the board.
pub fn refresh_all_badges(scene: &mut Scene) -> Vec<(EntityId, bool)> {
    let ids = scene.resource_ids();
    ids.iter().flat_map(|id| refresh_badges(scene, id)).collect()
}

/// Proof that a cost request was issued for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostTicket {
    pub group: EntityId,
    seq: u64,
}

/// Per-group request sequencing for cost refreshes.
#[derive(Debug, Default)]
pub struct CostTracker {
    next_seq: u64,
    latest: HashMap<EntityId, u64>,
}

impl CostTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new cost request, superseding any in flight.
    pub fn issue(&mut self, group: EntityId) -> CostTicket {
        self.next_seq += 1;
        self.latest.insert(group, self.next_seq);
        CostTicket { group, seq: self.next_seq }
    }

    /// `true` if `ticket` is still the latest request for its group.
    #[must_use]
    pub fn accept(&self, ticket: &CostTicket) -> bool {
        self.latest.get(&ticket.group) == Some(&ticket.seq)
    }

    /// Drop sequencing state for a deleted group. Late responses are rejected.
    pub fn forget(&mut self, group: EntityId) {
        self.latest.remove(&group);
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }
}
