//! HTTP implementation of [`BoardApi`] over the board backend's JSON API.
//!
//! Thin wrapper: builds the URL, sends JSON, maps the status. Status mapping
//! and body parsing are pure functions for testability.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ApiError, BoardApi, BoardDocument, BoardLayout, Created, GroupDraft, PlacementDraft, PlacementUpdate,
};
use crate::config::ApiConfig;
use crate::scene::{BoardId, GroupCost, GroupId, PlacementId};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpBoardApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBoardApi {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the token is not a valid
    /// header value or the TLS stack fails to initialize.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.session_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        debug!(%method, path, "board api request");
        let request = self.http.request(method, self.url(path));
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        check_status(status, path, text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send::<()>(Method::GET, path, None).await?;
        parse_json(&text)
    }
}

// =============================================================================
// PATHS
// =============================================================================

fn board_path(board_id: BoardId) -> String {
    format!("/api/boards/{board_id}/")
}

fn board_groups_path(board_id: BoardId) -> String {
    format!("/api/boards/{board_id}/groups/")
}

fn group_path(group_id: GroupId) -> String {
    format!("/api/groups/{group_id}/")
}

fn group_cost_path(group_id: GroupId) -> String {
    format!("/api/groups/{group_id}/cost/")
}

fn board_placements_path(board_id: BoardId) -> String {
    format!("/api/boards/{board_id}/placements/")
}

fn placement_path(placement_id: PlacementId) -> String {
    format!("/api/placements/{placement_id}/")
}

// =============================================================================
// PARSING
// =============================================================================

fn check_status(status: u16, path: &str, body: String) -> Result<String, ApiError> {
    match status {
        200..=299 => Ok(body),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound(path.to_string())),
        _ => Err(ApiError::Status { status, body }),
    }
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

// =============================================================================
// TRAIT IMPL
// =============================================================================

#[async_trait::async_trait]
impl BoardApi for HttpBoardApi {
    async fn fetch_board(&self, board_id: BoardId) -> Result<BoardDocument, ApiError> {
        self.get_json(&board_path(board_id)).await
    }

    async fn save_board(&self, board_id: BoardId, layout: &BoardLayout) -> Result<(), ApiError> {
        self.send(Method::PUT, &board_path(board_id), Some(layout)).await?;
        Ok(())
    }

    async fn create_group(&self, board_id: BoardId, draft: &GroupDraft) -> Result<GroupId, ApiError> {
        let text = self.send(Method::POST, &board_groups_path(board_id), Some(draft)).await?;
        let created: Created = parse_json(&text)?;
        Ok(created.id)
    }

    async fn update_group(&self, group_id: GroupId, draft: &GroupDraft) -> Result<(), ApiError> {
        self.send(Method::PUT, &group_path(group_id), Some(draft)).await?;
        Ok(())
    }

    async fn delete_group(&self, group_id: GroupId) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, &group_path(group_id), None).await?;
        Ok(())
    }

    async fn group_cost(&self, group_id: GroupId) -> Result<GroupCost, ApiError> {
        self.get_json(&group_cost_path(group_id)).await
    }

    async fn create_placement(&self, board_id: BoardId, draft: &PlacementDraft) -> Result<PlacementId, ApiError> {
        let text = self.send(Method::POST, &board_placements_path(board_id), Some(draft)).await?;
        let created: Created = parse_json(&text)?;
        Ok(created.id)
    }

    async fn update_placement(&self, placement_id: PlacementId, update: &PlacementUpdate) -> Result<(), ApiError> {
        self.send(Method::PUT, &placement_path(placement_id), Some(update)).await?;
        Ok(())
    }

    async fn delete_placement(&self, placement_id: PlacementId) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, &placement_path(placement_id), None).await?;
        Ok(())
    }
}
