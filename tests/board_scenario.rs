//! End-to-end board scenario through the public session API, against an
//! in-memory backend.
#![allow(clippy::float_cmp)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use costboard::api::{BoardDocument, BoardLayout, GroupDraft, PlacementDraft, PlacementUpdate};
use costboard::geometry::{Point, Rect};
use costboard::scene::{BoardId, EntityId, GroupCost, GroupId, PlacementId, ResourceId, ResourceRef};
use costboard::{Action, ApiError, BoardApi, BoardSession, EngineConfig, SceneEvent, View};
use uuid::Uuid;

/// Backend that prices every placement at 25.
#[derive(Default)]
struct Backend {
    board_id: BoardId,
    placements: Mutex<HashMap<PlacementId, Option<GroupId>>>,
    cost_requests: Mutex<Vec<GroupId>>,
}

impl Backend {
    fn cost_requests_for(&self, group: GroupId) -> usize {
        self.cost_requests.lock().unwrap().iter().filter(|g| **g == group).count()
    }
}

#[async_trait]
impl BoardApi for Backend {
    async fn fetch_board(&self, board_id: BoardId) -> Result<BoardDocument, ApiError> {
        if board_id != self.board_id {
            return Err(ApiError::NotFound(format!("/api/boards/{board_id}/")));
        }
        Ok(BoardDocument {
            id: board_id,
            name: "Q3 ownership".into(),
            read_only: false,
            groups: Vec::new(),
            placements: Vec::new(),
            annotations: Vec::new(),
            viewport: None,
        })
    }

    async fn save_board(&self, _board_id: BoardId, _layout: &BoardLayout) -> Result<(), ApiError> {
        Ok(())
    }

    async fn create_group(&self, _board_id: BoardId, _draft: &GroupDraft) -> Result<GroupId, ApiError> {
        Ok(Uuid::new_v4())
    }

    async fn update_group(&self, _group_id: GroupId, _draft: &GroupDraft) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete_group(&self, _group_id: GroupId) -> Result<(), ApiError> {
        Ok(())
    }

    async fn group_cost(&self, group_id: GroupId) -> Result<GroupCost, ApiError> {
        self.cost_requests.lock().unwrap().push(group_id);
        let count = self.placements.lock().unwrap().values().filter(|g| **g == Some(group_id)).count();
        let count = u32::try_from(count).unwrap();
        Ok(GroupCost { calculated_cost: f64::from(count) * 25.0, resource_count: count })
    }

    async fn create_placement(&self, _board_id: BoardId, draft: &PlacementDraft) -> Result<PlacementId, ApiError> {
        let id = Uuid::new_v4();
        self.placements.lock().unwrap().insert(id, draft.group_id);
        Ok(id)
    }

    async fn update_placement(&self, placement_id: PlacementId, update: &PlacementUpdate) -> Result<(), ApiError> {
        self.placements.lock().unwrap().insert(placement_id, update.group_id);
        Ok(())
    }

    async fn delete_placement(&self, placement_id: PlacementId) -> Result<(), ApiError> {
        self.placements.lock().unwrap().remove(&placement_id);
        Ok(())
    }
}

fn added(actions: &[Action]) -> EntityId {
    actions
        .iter()
        .find_map(|a| match a {
            Action::EntityAdded { id } => Some(*id),
            _ => None,
        })
        .unwrap()
}

fn vm() -> ResourceRef {
    ResourceRef {
        id: ResourceId::new("i-0abc"),
        name: "api-server".into(),
        resource_type: "ec2".into(),
        provider: "aws".into(),
    }
}

/// Move a card so its center lands on `center`.
async fn move_card_center(session: &mut BoardSession, card: EntityId, center: Point) {
    let rect = session.scene().unwrap().card(card).unwrap().rect;
    let target = rect.moved_to(center.x - rect.width / 2.0, center.y - rect.height / 2.0);
    session.handle(SceneEvent::MoveStart { id: card }).await;
    session.handle(SceneEvent::MoveUpdate { id: card, rect: target }).await;
    session.handle(SceneEvent::MoveCommit { id: card, rect: target }).await;
}

#[tokio::test]
async fn groups_cards_costs_and_badges() {
    let backend = Arc::new(Backend { board_id: Uuid::new_v4(), ..Backend::default() });
    let mut session = BoardSession::new(backend.clone(), EngineConfig::default());
    session.open_board(backend.board_id).await;
    assert_eq!(session.view(), View::Board { board_id: backend.board_id });

    // Two groups never overlap: the second is pushed off the first.
    let g = added(&session.create_group("Acme", None, Rect::new(0.0, 0.0, 300.0, 200.0)).await);
    let g2 = added(&session.create_group("Globex", None, Rect::new(50.0, 50.0, 300.0, 200.0)).await);
    let scene = session.scene().unwrap();
    let (g_rect, g2_rect) = (scene.group(g).unwrap().rect, scene.group(g2).unwrap().rect);
    assert!(!g_rect.intersects(&g2_rect));
    let g_remote = scene.group(g).unwrap().remote_id.unwrap();

    // Card dropped outside G, then dragged in.
    let r = added(&session.place_resource(vm(), Point::new(600.0, 600.0)).await);
    assert_eq!(session.scene().unwrap().card(r).unwrap().group, None);
    let before = backend.cost_requests_for(g_remote);
    move_card_center(&mut session, r, Point::new(100.0, 100.0)).await;
    assert_eq!(session.scene().unwrap().card(r).unwrap().group, Some(g));
    assert_eq!(backend.cost_requests_for(g_remote), before + 1);

    // Dragged back out: membership clears and G is refreshed again.
    move_card_center(&mut session, r, Point::new(680.0, 632.0)).await;
    assert_eq!(session.scene().unwrap().card(r).unwrap().group, None);
    assert_eq!(backend.cost_requests_for(g_remote), before + 2);
    assert_eq!(session.scene().unwrap().group(g).unwrap().cost.map(|c| c.resource_count), Some(0));

    // Back inside, then cloned: both placements count and both show the badge.
    move_card_center(&mut session, r, Point::new(100.0, 100.0)).await;
    let r2 = added(&session.clone_placement(r).await);
    let scene = session.scene().unwrap();
    assert_eq!(scene.card(r2).unwrap().group, Some(g));
    assert!(scene.card(r).unwrap().multiplicity_badge);
    assert!(scene.card(r2).unwrap().multiplicity_badge);
    assert_eq!(
        scene.group(g).unwrap().cost,
        Some(GroupCost { calculated_cost: 50.0, resource_count: 2 })
    );

    // Deleting the clone clears the badge on the original.
    session.delete_entity(r2).await;
    let scene = session.scene().unwrap();
    assert!(!scene.card(r).unwrap().multiplicity_badge);
    assert_eq!(scene.group(g).unwrap().cost.map(|c| c.resource_count), Some(1));
}

#[tokio::test]
async fn committed_groups_never_overlap() {
    let backend = Arc::new(Backend { board_id: Uuid::new_v4(), ..Backend::default() });
    let mut session = BoardSession::new(backend.clone(), EngineConfig::default());
    session.open_board(backend.board_id).await;

    let mut ids = Vec::new();
    for i in 0..4 {
        let x = f64::from(i) * 40.0;
        ids.push(added(&session.create_group(format!("g{i}"), None, Rect::new(x, x, 150.0, 100.0)).await));
    }

    for (step, id) in ids.iter().cycle().take(12).enumerate() {
        let offset = f64::from(u32::try_from(step).unwrap()) * 37.0 % 400.0;
        let rect = Rect::new(offset, 400.0 - offset, 150.0, 100.0);
        session.handle(SceneEvent::MoveStart { id: *id }).await;
        session.handle(SceneEvent::MoveUpdate { id: *id, rect }).await;
        session.handle(SceneEvent::MoveCommit { id: *id, rect }).await;

        let rects: Vec<Rect> = session.scene().unwrap().groups().map(|g| g.rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?} after step {step}");
            }
        }
    }
}

#[tokio::test]
async fn reseeded_board_falls_back_to_list() {
    let backend = Arc::new(Backend { board_id: Uuid::new_v4(), ..Backend::default() });
    let mut session = BoardSession::new(backend, EngineConfig::default());

    let actions = session.open_board(Uuid::new_v4()).await;

    assert_eq!(actions, vec![Action::Navigate { view: View::List }]);
    assert!(session.board_id().is_none());
}
