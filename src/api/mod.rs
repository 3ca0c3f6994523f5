//! Backend contract: the persistence operations the engine calls into.
//!
//! DESIGN
//! ======
//! `BoardApi` is an async trait so the session can be driven against the real
//! HTTP backend (`http::HttpBoardApi`) or an in-memory mock in tests. The
//! trait speaks engine types (`Rect`, `Point`, `ResourceId`) plus a handful
//! of wire records; transport details stay in `http`.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns `ApiError`. The session maps errors to host actions:
//! `Unauthorized` redirects to login, `NotFound` on open falls back to the
//! board list, everything else becomes a status message.

pub mod http;

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::scene::{Annotation, BoardId, GroupCost, GroupId, PlacementId, ResourceId, ResourceRef};
use crate::viewport::Viewport;

// =============================================================================
// ERRORS
// =============================================================================

/// Stable, grepable code plus retry hint for any error surfaced to the host.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Session expired or missing (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The addressed record does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Status { .. } => "E_API_STATUS",
            Self::Transport(_) => "E_API_TRANSPORT",
            Self::Decode(_) => "E_API_DECODE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Full board as returned by `GET board`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub placements: Vec<PlacementRecord>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

/// A persisted group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(flatten)]
    pub rect: Rect,
}

/// A persisted resource placement. `position` is the card's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: PlacementId,
    pub resource: ResourceRef,
    pub position: Point,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// Body of `PUT board`: only state without backend identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub annotations: Vec<Annotation>,
    pub viewport: Viewport,
}

/// Body of `POST group` / `PUT group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub rect: Rect,
}

/// Body of `POST resource-placement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDraft {
    pub resource_id: ResourceId,
    pub position: Point,
    pub group_id: Option<GroupId>,
}

/// Body of `PUT placement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementUpdate {
    pub position: Point,
    pub group_id: Option<GroupId>,
}

/// Response of any create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: uuid::Uuid,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Board persistence backend. Enables mocking in tests.
///
/// # Errors
///
/// Every method returns an [`ApiError`] if the call fails.
#[async_trait::async_trait]
pub trait BoardApi: Send + Sync {
    async fn fetch_board(&self, board_id: BoardId) -> Result<BoardDocument, ApiError>;

    async fn save_board(&self, board_id: BoardId, layout: &BoardLayout) -> Result<(), ApiError>;

    async fn create_group(&self, board_id: BoardId, draft: &GroupDraft) -> Result<GroupId, ApiError>;

    async fn update_group(&self, group_id: GroupId, draft: &GroupDraft) -> Result<(), ApiError>;

    async fn delete_group(&self, group_id: GroupId) -> Result<(), ApiError>;

    /// Backend-authoritative cost rollup of one group.
    async fn group_cost(&self, group_id: GroupId) -> Result<GroupCost, ApiError>;

    async fn create_placement(&self, board_id: BoardId, draft: &PlacementDraft) -> Result<PlacementId, ApiError>;

    async fn update_placement(&self, placement_id: PlacementId, update: &PlacementUpdate) -> Result<(), ApiError>;

    async fn delete_placement(&self, placement_id: PlacementId) -> Result<(), ApiError>;
}
