use super::*;
use crate::geometry::Rect;
use crate::scene::{Entity, Group, ResourceCard, ResourceRef};

fn resource(id: &str) -> ResourceRef {
    ResourceRef { id: ResourceId::new(id), name: id.to_owned(), resource_type: String::new(), provider: String::new() }
}

fn add_card(scene: &mut Scene, id: &str, group: Option<EntityId>) -> EntityId {
    let mut card = ResourceCard::new(resource(id), Rect::new(0.0, 0.0, 160.0, 64.0));
    card.group = group;
    let card_id = card.id;
    scene.insert(Entity::ResourceCard(card));
    card_id
}

fn add_group(scene: &mut Scene) -> EntityId {
    let g = Group::new("G", "#fff", Rect::new(0.0, 0.0, 10.0, 10.0));
    let id = g.id;
    scene.insert(Entity::Group(g));
    id
}

fn badge(scene: &Scene, card: EntityId) -> bool {
    scene.card(card).is_some_and(|c| c.multiplicity_badge)
}

// =============================================================
// affected_groups
// =============================================================

#[test]
fn affected_groups_collects_every_placement_owner() {
    let mut scene = Scene::new();
    let g1 = add_group(&mut scene);
    let g2 = add_group(&mut scene);
    add_card(&mut scene, "r1", Some(g1));
    add_card(&mut scene, "r1", Some(g2));
    add_card(&mut scene, "r1", None);
    add_card(&mut scene, "r2", Some(g1));

    let groups = affected_groups(&scene, &ResourceId::new("r1"), None);
    assert_eq!(groups, BTreeSet::from([g1, g2]));
}

#[test]
fn affected_groups_includes_extra_group() {
    let mut scene = Scene::new();
    let left = add_group(&mut scene);
    add_card(&mut scene, "r1", None);

    let groups = affected_groups(&scene, &ResourceId::new("r1"), Some(left));
    assert_eq!(groups, BTreeSet::from([left]));
}

#[test]
fn affected_groups_for_unplaced_resource_is_empty() {
    assert!(affected_groups(&Scene::new(), &ResourceId::new("nope"), None).is_empty());
}

// =============================================================
// refresh_badges
// =============================================================

#[test]
fn single_placement_has_no_badge() {
    let mut scene = Scene::new();
    let card = add_card(&mut scene, "r1", None);
    assert!(refresh_badges(&mut scene, &ResourceId::new("r1")).is_empty());
    assert!(!badge(&scene, card));
}

#[test]
fn clones_show_badge_symmetrically() {
    let mut scene = Scene::new();
    let p1 = add_card(&mut scene, "r1", None);
    let p2 = add_card(&mut scene, "r1", None);
    let other = add_card(&mut scene, "r2", None);

    let changed = refresh_badges(&mut scene, &ResourceId::new("r1"));
    assert_eq!(changed, vec![(p1, true), (p2, true)]);
    assert!(badge(&scene, p1) && badge(&scene, p2));
    assert!(!badge(&scene, other));
}

#[test]
fn deleting_clone_clears_remaining_badge() {
    let mut scene = Scene::new();
    let p1 = add_card(&mut scene, "r1", None);
    let p2 = add_card(&mut scene, "r1", None);
    refresh_badges(&mut scene, &ResourceId::new("r1"));

    scene.remove(p2);
    assert_eq!(refresh_badges(&mut scene, &ResourceId::new("r1")), vec![(p1, false)]);
    assert!(!badge(&scene, p1));
}

#[test]
fn refresh_all_badges_covers_every_resource() {
    let mut scene = Scene::new();
    let a1 = add_card(&mut scene, "a", None);
    let a2 = add_card(&mut scene, "a", None);
    add_card(&mut scene, "b", None);

    let mut changed = refresh_all_badges(&mut scene);
    changed.sort();
    let mut expected = vec![(a1, true), (a2, true)];
    expected.sort();
    assert_eq!(changed, expected);
    assert!(refresh_all_badges(&mut scene).is_empty());
}

// =============================================================
// CostTracker
// =============================================================

#[test]
fn only_latest_ticket_is_accepted() {
    let mut tracker = CostTracker::new();
    let group = uuid::Uuid::new_v4();
    let stale = tracker.issue(group);
    let fresh = tracker.issue(group);
    assert!(!tracker.accept(&stale));
    assert!(tracker.accept(&fresh));
}

#[test]
fn tickets_are_independent_per_group() {
    let mut tracker = CostTracker::new();
    let a = tracker.issue(uuid::Uuid::new_v4());
    let b = tracker.issue(uuid::Uuid::new_v4());
    assert!(tracker.accept(&a));
    assert!(tracker.accept(&b));
}

#[test]
fn forgotten_group_rejects_late_response() {
    let mut tracker = CostTracker::new();
    let group = uuid::Uuid::new_v4();
    let ticket = tracker.issue(group);
    tracker.forget(group);
    assert!(!tracker.accept(&ticket));

    let again = tracker.issue(group);
    tracker.clear();
    assert!(!tracker.accept(&again));
}
