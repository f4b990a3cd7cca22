//! Gateway webhook endpoint.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::models::WebhookEvent;
use crate::services::metrics;
use crate::services::webhook::{verify_webhook_signature, HandlerOutcome};
use crate::AppState;

const SIGNATURE_HEADER: &str = "x-firstdata-signature";

/// Receive one gateway notification.
///
/// Verification happens against the raw body, before any parsing. A bad
/// signature is the only rejection; everything past that point is
/// acknowledged with 200 so the gateway never retries a delivery it has
/// already handed over, even when our handling of it failed.
pub async fn firstdata_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    verify_webhook_signature(&state.config.webhook, &body, signature)?;

    let event: WebhookEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Unparsable webhook body, acknowledging anyway");
            metrics::record_webhook_event("unparsable", "failed");
            return Ok(Json(json!({ "received": true })));
        }
    };

    let outcome = state.dispatcher.dispatch(&event).await;
    let outcome_label = match &outcome {
        HandlerOutcome::Handled => "handled",
        HandlerOutcome::Ignored => "ignored",
        HandlerOutcome::Failed(reason) => {
            tracing::error!(
                event_type = %event.event_type,
                reason = %reason,
                "Webhook handler failed"
            );
            "failed"
        }
    };
    metrics::record_webhook_event(event.kind().as_str(), outcome_label);

    Ok(Json(json!({ "received": true })))
}
