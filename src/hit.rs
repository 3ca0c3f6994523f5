#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::geometry::Point;
use crate::scene::{Entity, EntityId, Scene};
use crate::viewport::Viewport;

/// Which layer of the board was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitLayer {
    /// A resource card or annotation drawn above the groups.
    Item,
    /// The body of a group region.
    Group,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub entity_id: EntityId,
    pub layer: HitLayer,
}

/// Test which entity (if any) is under `world_pt`.
///
/// Cards and annotations sit above groups regardless of insertion order, so
/// they are checked first, topmost first. Transient grid lines are never hit.
#[must_use]
pub fn hit_test(scene: &Scene, world_pt: Point) -> Option<Hit> {
    let items = scene.iter().rev().filter(|e| !e.is_transient() && !matches!(e, Entity::Group(_)));
    for entity in items {
        if entity.rect().contains_point(world_pt) {
            return Some(Hit { entity_id: entity.id(), layer: HitLayer::Item });
        }
    }

    scene
        .groups()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .find(|g| g.rect.contains_point(world_pt))
        .map(|g| Hit { entity_id: g.id, layer: HitLayer::Group })
}

/// Hit test a screen-space point through the viewport.
#[must_use]
pub fn hit_test_screen(scene: &Scene, viewport: &Viewport, screen_pt: Point) -> Option<Hit> {
    hit_test(scene, viewport.screen_to_world(screen_pt))
}
