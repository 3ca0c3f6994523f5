//! Backend synchronization for an open board.
//!
//! `Link` wraps the `BoardApi` handle together with the per-cycle 401 latch.
//! Every backend call made while handling one public session operation goes
//! through it: once a call comes back `Unauthorized` the host is told to
//! redirect to login and every later call in the same cycle is skipped.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::OpenBoard;
use crate::api::{ApiError, BoardApi, BoardLayout, ErrorCode, GroupDraft, PlacementUpdate};
use crate::events::Action;
use crate::rollup::{affected_groups, refresh_all_badges, refresh_badges};
use crate::scene::{EntityId, GroupId, ResourceId, Scene};

pub(super) struct Link {
    pub(super) api: Arc<dyn BoardApi>,
    unauthorized: bool,
}

impl Link {
    pub(super) fn new(api: Arc<dyn BoardApi>) -> Self {
        Self { api, unauthorized: false }
    }

    /// Start handling a new public operation.
    pub(super) fn begin_cycle(&mut self) {
        self.unauthorized = false;
    }

    /// `true` once a call in this cycle was rejected as unauthorized.
    pub(super) fn blocked(&self) -> bool {
        self.unauthorized
    }

    /// Turn a call result into a value, reporting failures to the host.
    pub(super) fn settle<T>(&mut self, what: &str, result: Result<T, ApiError>, actions: &mut Vec<Action>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(ApiError::Unauthorized) => {
                warn!(what, "backend rejected session; redirecting to login");
                if !self.unauthorized {
                    actions.push(Action::RedirectToLogin);
                }
                self.unauthorized = true;
                None
            }
            Err(e) => {
                warn!(what, error = %e, code = e.error_code(), "backend call failed");
                actions.push(Action::status(format!("{what} failed: {e} [{}]", e.error_code())));
                None
            }
        }
    }

    /// Persist one card's position and owning group.
    pub(super) async fn persist_placement(&mut self, board: &OpenBoard, card_id: EntityId, actions: &mut Vec<Action>) {
        if board.read_only || self.blocked() {
            return;
        }
        let Some(card) = board.scene.card(card_id) else {
            return;
        };
        let Some(placement_id) = card.placement_id else {
            debug!(%card_id, "card has no placement id yet; skipping update");
            return;
        };
        let update = PlacementUpdate { position: card.rect.origin(), group_id: remote_group(&board.scene, card.group) };
        let result = self.api.update_placement(placement_id, &update).await;
        self.settle("update placement", result, actions);
    }

    /// Persist one group's geometry, name and color.
    pub(super) async fn persist_group(&mut self, board: &OpenBoard, group_id: EntityId, actions: &mut Vec<Action>) {
        if board.read_only || self.blocked() {
            return;
        }
        let Some(group) = board.scene.group(group_id) else {
            return;
        };
        let Some(remote_id) = group.remote_id else {
            debug!(%group_id, "group not persisted yet; skipping update");
            return;
        };
        let draft = GroupDraft { name: group.name.clone(), color: group.color.clone(), rect: group.rect };
        let result = self.api.update_group(remote_id, &draft).await;
        self.settle("update group", result, actions);
    }

    /// Fetch the backend cost of each group and apply the responses that are
    /// still the latest request for their group.
    pub(super) async fn refresh_costs(
        &mut self,
        board: &mut OpenBoard,
        groups: impl IntoIterator<Item = EntityId>,
        actions: &mut Vec<Action>,
    ) {
        for group_id in groups {
            if self.blocked() {
                break;
            }
            let Some(remote_id) = board.scene.group(group_id).and_then(|g| g.remote_id) else {
                continue;
            };
            let ticket = board.costs.issue(group_id);
            let result = self.api.group_cost(remote_id).await;
            let Some(cost) = self.settle("refresh group cost", result, actions) else {
                continue;
            };
            if !board.costs.accept(&ticket) {
                debug!(%group_id, "stale cost response dropped");
                continue;
            }
            if let Some(group) = board.scene.group_mut(group_id) {
                group.cost = Some(cost);
                actions.push(Action::CostChanged { group: group_id, cost });
            }
        }
    }

    /// Rollup after a placement or membership change: cost refresh for every
    /// affected group first, then multiplicity badges for each resource.
    pub(super) async fn rollup(
        &mut self,
        board: &mut OpenBoard,
        resources: &BTreeSet<ResourceId>,
        extra_groups: &BTreeSet<EntityId>,
        actions: &mut Vec<Action>,
    ) {
        let mut groups = extra_groups.clone();
        for resource_id in resources {
            groups.extend(affected_groups(&board.scene, resource_id, None));
        }
        self.refresh_costs(board, groups, actions).await;

        for resource_id in resources {
            push_badges(refresh_badges(&mut board.scene, resource_id), actions);
        }
    }

    /// Recompute every group cost and every badge, e.g. after open or restore.
    pub(super) async fn rollup_all(&mut self, board: &mut OpenBoard, actions: &mut Vec<Action>) {
        let groups: Vec<EntityId> = board.scene.groups().map(|g| g.id).collect();
        self.refresh_costs(board, groups, actions).await;
        push_badges(refresh_all_badges(&mut board.scene), actions);
    }

    /// Persist annotations and viewport. Caller has already taken the
    /// autosave deadline.
    pub(super) async fn save_layout(&mut self, board: &mut OpenBoard, actions: &mut Vec<Action>) {
        actions.push(Action::SaveStatusChanged { status: board.autosave.status() });

        let ok = if self.blocked() {
            false
        } else {
            let layout = BoardLayout { annotations: board.scene.annotations().cloned().collect(), viewport: board.viewport };
            let result = self.api.save_board(board.id, &layout).await;
            self.settle("autosave", result, actions).is_some()
        };
        if ok {
            info!(board_id = %board.id, "autosave flushed");
        }
        if let Some(status) = board.autosave.finish(ok) {
            actions.push(Action::SaveStatusChanged { status });
        }
    }
}

/// Backend id of the group a card belongs to, if that group is persisted.
pub(super) fn remote_group(scene: &Scene, group: Option<EntityId>) -> Option<GroupId> {
    group.and_then(|id| scene.group(id)).and_then(|g| g.remote_id)
}

/// Distinct resources behind a set of cards.
pub(super) fn resources_of(scene: &Scene, cards: impl IntoIterator<Item = EntityId>) -> BTreeSet<ResourceId> {
    cards
        .into_iter()
        .filter_map(|id| scene.card(id))
        .map(|c| c.resource.id.clone())
        .collect()
}

pub(super) fn schedule_autosave(board: &mut OpenBoard, actions: &mut Vec<Action>) {
    if let Some(status) = board.autosave.schedule(Instant::now()) {
        actions.push(Action::SaveStatusChanged { status });
    }
}

fn push_badges(changed: Vec<(EntityId, bool)>, actions: &mut Vec<Action>) {
    actions.extend(changed.into_iter().map(|(id, visible)| Action::BadgeChanged { id, visible }));
}
