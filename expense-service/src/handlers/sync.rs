//! Sync trigger and board verification handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::middleware::company::CompanyContext;
use service_core::response::ApiResponse;

use crate::models::{BoardVerificationResult, ColumnMapping};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub column_mapping: Option<ColumnMapping>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub items_processed: u64,
    pub items_created: u64,
    pub items_updated: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub last_sync_at: String,
}

/// Run one sync pass for the caller's company.
///
/// The body may carry an explicit column mapping which, once validated
/// against the live board, replaces the stored one for future passes.
pub async fn sync(
    State(state): State<AppState>,
    company: CompanyContext,
    payload: Option<Json<SyncRequest>>,
) -> Result<Json<ApiResponse<SyncResponse>>, AppError> {
    let request = payload.map(|Json(p)| p).unwrap_or_default();

    tracing::info!(
        company_id = %company.company_id,
        user_id = ?company.user_id,
        explicit_mapping = request.column_mapping.is_some(),
        "Sync pass requested"
    );

    let result = state
        .sync_engine
        .run_sync(&company.company_id, request.column_mapping)
        .await?;

    Ok(Json(ApiResponse::ok(SyncResponse {
        items_processed: result.items_processed,
        items_created: result.items_created,
        items_updated: result.items_updated,
        errors: result.errors,
        last_sync_at: DateTime::now().try_to_rfc3339_string().unwrap_or_default(),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBoardParams {
    pub board_id: String,
}

/// Verify a board configuration: fetch its columns and propose a best-effort
/// column mapping for the admin to confirm or edit.
///
/// Board problems are data, not transport failures: an unreachable or unknown
/// board answers `valid: false` with the reason, HTTP 200.
pub async fn verify_board(
    State(state): State<AppState>,
    _company: CompanyContext,
    Query(params): Query<VerifyBoardParams>,
) -> Json<BoardVerificationResult> {
    if !state.monday.is_configured() {
        return Json(BoardVerificationResult::invalid(
            "Monday API token not configured",
        ));
    }

    match state.monday.get_board(&params.board_id).await {
        Ok((name, columns)) => {
            let suggested = crate::services::mapping::detect_mapping(&columns);
            let required_fields = crate::services::mapping::required_fields_resolved(&suggested);

            tracing::info!(
                board_id = %params.board_id,
                board_name = %name,
                columns = columns.len(),
                "Board verified"
            );

            Json(BoardVerificationResult {
                valid: true,
                board_name: Some(name),
                suggested_mapping: if suggested.is_empty() {
                    None
                } else {
                    Some(suggested)
                },
                required_fields,
                columns,
                error: None,
            })
        }
        Err(e) => {
            tracing::warn!(board_id = %params.board_id, error = %e, "Board verification failed");
            Json(BoardVerificationResult::invalid(e.to_string()))
        }
    }
}
