//! Shared numeric constants for the board engine.

// ── Resource cards ──────────────────────────────────────────────

/// Fixed width of a resource card in world units.
pub const CARD_WIDTH: f64 = 160.0;

/// Fixed height of a resource card in world units.
pub const CARD_HEIGHT: f64 = 64.0;

/// Diagonal offset applied to a cloned placement relative to its source.
pub const CLONE_OFFSET: f64 = 30.0;

/// Diagonal offset applied to pasted entities relative to the clipboard.
pub const PASTE_OFFSET: f64 = 20.0;

// ── Groups ──────────────────────────────────────────────────────

/// Smallest width or height a group can be resized to.
pub const MIN_GROUP_SIZE: f64 = 40.0;

/// Fill color for groups created without an explicit one.
pub const DEFAULT_GROUP_COLOR: &str = "#4F7CAC";

// ── Placement search ────────────────────────────────────────────

/// Distance the candidate box shifts along both axes per attempt.
pub const DEFAULT_PLACEMENT_STEP: f64 = 20.0;

/// Attempts before the last candidate is accepted as-is.
pub const DEFAULT_PLACEMENT_ATTEMPTS: usize = 50;

// ── History / autosave ──────────────────────────────────────────

/// Maximum number of snapshots kept on the undo stack.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Quiet period before a scheduled autosave fires, in milliseconds.
pub const DEFAULT_AUTOSAVE_MS: u64 = 3000;

// ── Alignment grid ──────────────────────────────────────────────

/// Spacing between alignment grid lines in world units.
pub const GRID_SPACING: f64 = 50.0;

/// Half-extent of the drawn grid around the origin in world units.
pub const GRID_EXTENT: f64 = 2000.0;

// ── Viewport ────────────────────────────────────────────────────

/// Zoom limits applied when restoring or setting the viewport.
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;
