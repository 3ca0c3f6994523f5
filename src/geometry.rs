//! Geometry primitives: points, axis-aligned rectangles, and free-spot search.
//!
//! Everything here is pure and unit-free; callers decide whether a value is
//! in world or screen space. Rectangles are stored as top-left corner plus
//! size, matching how the rendering toolkit reports entity geometry.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Top-left corner.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same size, new top-left corner.
    #[must_use]
    pub fn moved_to(&self, x: f64, y: f64) -> Self {
        Self { x, y, ..*self }
    }

    /// Same size, shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        self.moved_to(self.x + dx, self.y + dy)
    }

    /// Same position, new size.
    #[must_use]
    pub fn resized(&self, width: f64, height: f64) -> Self {
        Self { width, height, ..*self }
    }

    /// Separating-axis test. Rectangles that only share an edge do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Inclusive point-in-rectangle test.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// Free-function form of [`Rect::intersects`].
#[must_use]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.intersects(b)
}

/// Free-function form of [`Rect::contains_point`].
#[must_use]
pub fn contains_point(rect: &Rect, point: Point) -> bool {
    rect.contains_point(point)
}

/// Search for a top-left corner where a `width` x `height` box overlaps none
/// of `obstacles`.
///
/// Starting at `(initial_left, initial_top)`, the candidate shifts by `step`
/// along both axes until it is clear or `max_attempts` shifts have been
/// tried. Best effort: when attempts run out the last candidate is returned
/// even if it still overlaps something.
#[must_use]
pub fn find_non_overlapping_position(
    initial_left: f64,
    initial_top: f64,
    width: f64,
    height: f64,
    obstacles: &[Rect],
    step: f64,
    max_attempts: usize,
) -> Point {
    let mut candidate = Rect::new(initial_left, initial_top, width, height);
    let mut attempts = 0;
    while attempts < max_attempts && obstacles.iter().any(|o| candidate.intersects(o)) {
        candidate = candidate.translated(step, step);
        attempts += 1;
    }
    Point::new(candidate.x, candidate.y)
}
