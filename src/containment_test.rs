use super::*;
use crate::scene::{Entity, Group, ResourceCard, ResourceId, ResourceRef};

// =============================================================
// Helpers
// =============================================================

fn add_group(scene: &mut Scene, x: f64, y: f64, w: f64, h: f64) -> EntityId {
    let g = Group::new("G", "#fff", Rect::new(x, y, w, h));
    let id = g.id;
    scene.insert(Entity::Group(g));
    id
}

/// Card whose center lands on `(cx, cy)`.
fn add_card_centered(scene: &mut Scene, cx: f64, cy: f64) -> EntityId {
    let resource = ResourceRef {
        id: ResourceId::new("vm-1"),
        name: "vm-1".into(),
        resource_type: String::new(),
        provider: String::new(),
    };
    let c = ResourceCard::new(resource, Rect::new(cx - 80.0, cy - 32.0, 160.0, 64.0));
    let id = c.id;
    scene.insert(Entity::ResourceCard(c));
    id
}

fn owner(scene: &Scene, card: EntityId) -> Option<EntityId> {
    scene.card(card).and_then(|c| c.group)
}

// =============================================================
// resolve_group_move / resolve_group_resize
// =============================================================

#[test]
fn move_into_free_space_is_accepted() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    add_group(&mut scene, 500.0, 0.0, 300.0, 200.0);

    let candidate = Rect::new(0.0, 250.0, 300.0, 200.0);
    assert_eq!(resolve_group_move(&mut scene, a, candidate), Some(Resolution::Accepted));
    assert_eq!(scene.group(a).map(|g| g.rect), Some(candidate));
}

#[test]
fn move_onto_other_group_reverts_to_last_valid() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    add_group(&mut scene, 500.0, 0.0, 300.0, 200.0);

    // First a valid step, then an overlapping one.
    let valid = Rect::new(100.0, 0.0, 300.0, 200.0);
    assert_eq!(resolve_group_move(&mut scene, a, valid), Some(Resolution::Accepted));
    let overlapping = Rect::new(300.0, 0.0, 300.0, 200.0);
    assert_eq!(resolve_group_move(&mut scene, a, overlapping), Some(Resolution::Reverted(valid)));
    assert_eq!(scene.group(a).map(|g| g.rect), Some(valid));
}

#[test]
fn touching_another_group_is_allowed() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    add_group(&mut scene, 500.0, 0.0, 300.0, 200.0);
    let flush = Rect::new(200.0, 0.0, 300.0, 200.0);
    assert_eq!(resolve_group_move(&mut scene, a, flush), Some(Resolution::Accepted));
}

#[test]
fn resize_overlapping_other_group_reverts() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    add_group(&mut scene, 500.0, 0.0, 300.0, 200.0);
    let grown = Rect::new(0.0, 0.0, 600.0, 200.0);
    assert_eq!(
        resolve_group_resize(&mut scene, a, grown),
        Some(Resolution::Reverted(Rect::new(0.0, 0.0, 300.0, 200.0)))
    );
}

#[test]
fn resize_below_minimum_reverts() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let tiny = Rect::new(0.0, 0.0, 10.0, 200.0);
    assert!(matches!(resolve_group_resize(&mut scene, a, tiny), Some(Resolution::Reverted(_))));
}

#[test]
fn resolve_on_non_group_returns_none() {
    let mut scene = Scene::new();
    let card = add_card_centered(&mut scene, 10.0, 10.0);
    assert!(resolve_group_move(&mut scene, card, Rect::new(0.0, 0.0, 1.0, 1.0)).is_none());
}

#[test]
fn no_overlap_after_any_sequence_of_moves() {
    let mut scene = Scene::new();
    let a = add_group(&mut scene, 0.0, 0.0, 200.0, 200.0);
    let b = add_group(&mut scene, 300.0, 0.0, 200.0, 200.0);
    let c = add_group(&mut scene, 0.0, 300.0, 200.0, 200.0);
    let ids = [a, b, c];

    for step in 0..60 {
        let id = ids[step % 3];
        let offset = f64::from(u32::try_from(step).unwrap_or(0)) * 17.0 % 400.0;
        let candidate = Rect::new(offset, 400.0 - offset, 200.0, 200.0);
        resolve_group_move(&mut scene, id, candidate);

        let rects: Vec<Rect> = scene.groups().map(|g| g.rect).collect();
        for (i, r1) in rects.iter().enumerate() {
            for r2 in rects.iter().skip(i + 1) {
                assert!(!r1.intersects(r2), "groups overlap at step {step}");
            }
        }
    }
}

// =============================================================
// reconcile_membership
// =============================================================

#[test]
fn reconcile_assigns_cards_now_inside() {
    let mut scene = Scene::new();
    let g = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let inside = add_card_centered(&mut scene, 100.0, 100.0);
    let outside = add_card_centered(&mut scene, 600.0, 100.0);

    let change = reconcile_membership(&mut scene, g);
    assert_eq!(change.joined, vec![inside]);
    assert!(change.left.is_empty());
    assert_eq!(owner(&scene, inside), Some(g));
    assert_eq!(owner(&scene, outside), None);
}

#[test]
fn reconcile_unassigns_cards_left_behind() {
    let mut scene = Scene::new();
    let g = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let card = add_card_centered(&mut scene, 100.0, 100.0);
    reconcile_membership(&mut scene, g);

    resolve_group_move(&mut scene, g, Rect::new(400.0, 0.0, 300.0, 200.0));
    let change = reconcile_membership(&mut scene, g);
    assert_eq!(change.left, vec![card]);
    assert!(change.joined.is_empty());
    assert_eq!(owner(&scene, card), None);
}

#[test]
fn reconcile_reports_group_that_lost_a_card() {
    let mut scene = Scene::new();
    let h = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let g = add_group(&mut scene, 300.0, 0.0, 200.0, 200.0);
    // On the shared edge: inside both bounds, which touch but do not overlap.
    let card = add_card_centered(&mut scene, 300.0, 100.0);
    assert!(reconcile_membership(&mut scene, h).displaced.is_empty());

    let change = reconcile_membership(&mut scene, g);
    assert_eq!(change.joined, vec![card]);
    assert_eq!(change.displaced, BTreeSet::from([h]));
    assert_eq!(owner(&scene, card), Some(g));
}

#[test]
fn reconcile_without_movement_is_empty() {
    let mut scene = Scene::new();
    let g = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    add_card_centered(&mut scene, 100.0, 100.0);
    reconcile_membership(&mut scene, g);
    assert!(reconcile_membership(&mut scene, g).is_empty());
}

#[test]
fn reconcile_missing_group_releases_its_cards() {
    let mut scene = Scene::new();
    let g = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let card = add_card_centered(&mut scene, 100.0, 100.0);
    reconcile_membership(&mut scene, g);
    scene.remove(g);

    let change = reconcile_membership(&mut scene, g);
    assert_eq!(change.left, vec![card]);
    assert_eq!(change.cards().count(), 1);
}

// =============================================================
// assign_card / release_members
// =============================================================

#[test]
fn assign_card_follows_center_point() {
    let mut scene = Scene::new();
    let g = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let card = add_card_centered(&mut scene, 500.0, 500.0);
    assert!(assign_card(&mut scene, card).is_none());

    if let Some(c) = scene.card_mut(card) {
        c.rect = Rect::new(20.0, 68.0, 160.0, 64.0);
    }
    assert_eq!(assign_card(&mut scene, card), Some(Reassignment { card, from: None, to: Some(g) }));

    if let Some(c) = scene.card_mut(card) {
        c.rect = Rect::new(400.0, 68.0, 160.0, 64.0);
    }
    assert_eq!(assign_card(&mut scene, card), Some(Reassignment { card, from: Some(g), to: None }));
}

#[test]
fn assign_card_overrides_stale_owner() {
    let mut scene = Scene::new();
    let g1 = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let g2 = add_group(&mut scene, 400.0, 0.0, 300.0, 200.0);
    let card = add_card_centered(&mut scene, 500.0, 100.0);
    if let Some(c) = scene.card_mut(card) {
        c.group = Some(g1);
    }
    assert_eq!(assign_all_cards(&mut scene), vec![Reassignment { card, from: Some(g1), to: Some(g2) }]);
    assert_eq!(owner(&scene, card), Some(g2));
}

#[test]
fn release_members_unassigns_only_that_group() {
    let mut scene = Scene::new();
    let g1 = add_group(&mut scene, 0.0, 0.0, 300.0, 200.0);
    let g2 = add_group(&mut scene, 400.0, 0.0, 300.0, 200.0);
    let a = add_card_centered(&mut scene, 100.0, 100.0);
    let b = add_card_centered(&mut scene, 500.0, 100.0);
    assign_all_cards(&mut scene);

    assert_eq!(release_members(&mut scene, g1), vec![a]);
    assert_eq!(owner(&scene, a), None);
    assert_eq!(owner(&scene, b), Some(g2));
}
