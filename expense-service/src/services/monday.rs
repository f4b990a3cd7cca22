//! Monday.com board API client.
//!
//! Wraps the GraphQL API: board/column discovery for verification and
//! cursor-paginated item reads for sync passes. The board is never written
//! to; items are read-only snapshots.

use crate::config::MondayConfig;
use crate::models::{BoardColumn, BoardItem};
use anyhow::Result;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use std::time::Duration;

/// Page size requested per items_page call.
const ITEMS_PAGE_LIMIT: u32 = 100;

/// Upper bound on pagination rounds in one sync pass. A misbehaving API that
/// keeps returning cursors must not hold the pass in an unbounded loop.
pub const MAX_SYNC_PAGES: u32 = 50;

#[derive(Clone)]
pub struct MondayClient {
    client: Client,
    config: MondayConfig,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardData>,
}

#[derive(Debug, Deserialize)]
struct BoardData {
    name: String,
    #[serde(default)]
    columns: Vec<BoardColumn>,
}

#[derive(Debug, Deserialize)]
struct BoardsItemsData {
    boards: Vec<BoardItemsPage>,
}

#[derive(Debug, Deserialize)]
struct BoardItemsPage {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct NextItemsPageData {
    next_items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    cursor: Option<String>,
    #[serde(default)]
    items: Vec<BoardItem>,
}

impl MondayClient {
    pub fn new(config: MondayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    /// Check if the board API is configured (API token is set).
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Fetch the board's name and column list.
    pub async fn get_board(&self, board_id: &str) -> Result<(String, Vec<BoardColumn>), AppError> {
        let query = r#"
            query ($boardId: [ID!]) {
                boards(ids: $boardId) {
                    name
                    columns { id title type }
                }
            }
        "#;

        let data: BoardsData = self
            .execute(query, json!({ "boardId": [board_id] }))
            .await?;

        let board = data.boards.into_iter().next().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Board {} not found", board_id))
        })?;

        tracing::debug!(
            board_id = %board_id,
            board_name = %board.name,
            columns = board.columns.len(),
            "Fetched board columns"
        );

        Ok((board.name, board.columns))
    }

    /// Pull every item on the board, following pagination cursors until
    /// exhausted. Tripping the page bound is an error, not silent truncation.
    pub async fn fetch_items(&self, board_id: &str) -> Result<Vec<BoardItem>, AppError> {
        let mut items = Vec::new();

        let first_page = self.fetch_first_page(board_id).await?;
        let mut cursor = first_page.cursor;
        items.extend(first_page.items);

        let mut pages = 1u32;
        while let Some(c) = cursor {
            if pages >= MAX_SYNC_PAGES {
                return Err(AppError::BadGateway(format!(
                    "board {} pagination exceeded {} pages",
                    board_id, MAX_SYNC_PAGES
                )));
            }

            let page = self.fetch_next_page(&c).await?;
            cursor = page.cursor;
            items.extend(page.items);
            pages += 1;
        }

        tracing::info!(
            board_id = %board_id,
            items = items.len(),
            pages,
            "Fetched board items"
        );

        Ok(items)
    }

    async fn fetch_first_page(&self, board_id: &str) -> Result<ItemsPage, AppError> {
        let query = r#"
            query ($boardId: [ID!], $limit: Int!) {
                boards(ids: $boardId) {
                    items_page(limit: $limit) {
                        cursor
                        items {
                            id
                            name
                            column_values { id text value type }
                        }
                    }
                }
            }
        "#;

        let data: BoardsItemsData = self
            .execute(query, json!({ "boardId": [board_id], "limit": ITEMS_PAGE_LIMIT }))
            .await?;

        let board = data.boards.into_iter().next().ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Board {} not found", board_id))
        })?;

        Ok(board.items_page)
    }

    async fn fetch_next_page(&self, cursor: &str) -> Result<ItemsPage, AppError> {
        let query = r#"
            query ($cursor: String!, $limit: Int!) {
                next_items_page(cursor: $cursor, limit: $limit) {
                    cursor
                    items {
                        id
                        name
                        column_values { id text value type }
                    }
                }
            }
        "#;

        let data: NextItemsPageData = self
            .execute(query, json!({ "cursor": cursor, "limit": ITEMS_PAGE_LIMIT }))
            .await?;

        Ok(data.next_items_page)
    }

    /// Issue one GraphQL request and unwrap the response envelope.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AppError> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Monday API token not configured"
            )));
        }

        let response = self
            .client
            .post(&self.config.api_base_url)
            .header("Authorization", self.config.api_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("board API unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::BadGateway(format!("board API read failed: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Board API request failed");
            return Err(AppError::BadGateway(format!(
                "board API returned {}",
                status
            )));
        }

        let parsed: GraphqlResponse<T> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %body, "Unexpected board API response shape");
            AppError::BadGateway(format!("unexpected board API response: {}", e))
        })?;

        if let Some(err) = parsed.errors.first() {
            tracing::error!(message = %err.message, "Board API returned GraphQL errors");
            return Err(AppError::BadGateway(format!(
                "board API error: {}",
                err.message
            )));
        }

        parsed.data.ok_or_else(|| {
            AppError::BadGateway("board API response carried no data".to_string())
        })
    }
}
