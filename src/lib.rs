//! Scene-state engine for the cost-ownership board.
//!
//! The board lets a user drop cloud-resource cards into drawn grouping
//! regions (one per customer, department, team...) so the backend can roll
//! up daily cost per group. This crate owns the client-side decision making
//! for that board: keeping the scene consistent under direct manipulation,
//! undo/redo over full-scene snapshots, and deciding when and what to persist.
//! Pixel drawing and raw transport stay with the host; the engine consumes
//! toolkit events and returns [`events::Action`]s for the host to apply.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Board session controller: open/close, undo/redo, event dispatch |
//! | [`scene`] | Entity model (`ResourceCard`, `Group`, `Annotation`) and the scene store |
//! | [`geometry`] | Points, rectangles, intersection and free-spot search |
//! | [`viewport`] | Pan/zoom state and coordinate conversions |
//! | [`hit`] | Hit-testing against scene entities |
//! | [`containment`] | Group collision policy and membership reconciliation |
//! | [`rollup`] | Cost-refresh sequencing and multiplicity badges |
//! | [`history`] | Snapshot-based undo/redo with bounded depth |
//! | [`autosave`] | Debounced persistence of annotations and viewport |
//! | [`api`] | Backend contract and the HTTP client implementing it |
//! | [`events`] | Toolkit events in, host actions out |
//! | [`config`] | Typed configuration loaded from the environment |
//! | [`consts`] | Shared numeric defaults |

pub mod api;
pub mod autosave;
pub mod config;
pub mod consts;
pub mod containment;
pub mod events;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod rollup;
pub mod scene;
pub mod session;
pub mod viewport;

pub use api::{ApiError, BoardApi, ErrorCode};
pub use config::EngineConfig;
pub use events::{Action, EntityDraft, SceneEvent, View};
pub use session::BoardSession;
