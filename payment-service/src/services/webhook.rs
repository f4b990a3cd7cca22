//! Webhook signature verification and event dispatch.
//!
//! Per delivery: received, signature-checked, then accepted or rejected.
//! Accepted deliveries are dispatched to a per-type handler whose outcome is
//! reported back as data; the HTTP layer acknowledges regardless of that
//! outcome so the gateway never retries a delivery this system has seen.

use crate::config::WebhookConfig;
use crate::models::{TransactionStatus, WebhookEvent, WebhookEventType};
use crate::services::repository::TransactionStore;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::utils::signature::verify_signature;
use std::sync::Arc;

/// Result of handling one accepted delivery. Failures are inspectable data,
/// not exceptions; the acknowledgment to the sender is unconditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    /// Event type this system intentionally does not act on.
    Ignored,
    Failed(String),
}

/// Verify a delivery's signature header against the raw request body.
///
/// A missing shared-secret configuration always rejects; a missing header
/// rejects unless the development-only permissive mode is active.
pub fn verify_webhook_signature(
    config: &WebhookConfig,
    body: &str,
    signature: Option<&str>,
) -> Result<(), AppError> {
    let secret = config.secret.expose_secret();
    if secret.is_empty() {
        tracing::error!("Webhook secret not configured, rejecting delivery");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid signature")));
    }

    let Some(signature) = signature else {
        if config.allow_unsigned {
            tracing::warn!("Accepting unsigned webhook delivery (permissive mode)");
            return Ok(());
        }
        tracing::warn!("Missing webhook signature header");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid signature")));
    };

    let valid = verify_signature(secret, body, signature).map_err(AppError::InternalError)?;
    if !valid {
        tracing::warn!("Webhook signature verification failed");
        return Err(AppError::Unauthorized(anyhow::anyhow!("Invalid signature")));
    }

    Ok(())
}

/// Routes verified events to their per-type handler.
#[derive(Clone)]
pub struct WebhookDispatcher {
    store: Arc<dyn TransactionStore>,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    pub async fn dispatch(&self, event: &WebhookEvent) -> HandlerOutcome {
        let kind = event.kind();
        tracing::info!(
            event_type = kind.as_str(),
            transaction_id = ?event.transaction_id,
            "Processing gateway webhook"
        );

        match kind {
            WebhookEventType::TransactionApproved => {
                self.update_status(event, TransactionStatus::Approved).await
            }
            WebhookEventType::TransactionDeclined => {
                self.update_status(event, TransactionStatus::Declined).await
            }
            WebhookEventType::TransactionVoided => {
                self.update_status(event, TransactionStatus::Voided).await
            }
            WebhookEventType::TransactionRefunded => {
                self.update_status(event, TransactionStatus::Refunded).await
            }
            WebhookEventType::FraudAlert => self.flag_transaction(event, "fraud alert").await,
            WebhookEventType::Chargeback => self.flag_transaction(event, "chargeback").await,
            WebhookEventType::Unknown(ref raw) => {
                // Unrecognized types are acknowledged, not rejected:
                // rejection would only teach the gateway to retry.
                tracing::debug!(event_type = %raw, "Unhandled webhook event type");
                HandlerOutcome::Ignored
            }
        }
    }

    async fn update_status(
        &self,
        event: &WebhookEvent,
        status: TransactionStatus,
    ) -> HandlerOutcome {
        let Some(ref gateway_id) = event.transaction_id else {
            return HandlerOutcome::Failed("event carried no transaction id".to_string());
        };

        match self
            .store
            .update_status_by_gateway_id(gateway_id, status)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    gateway_transaction_id = %gateway_id,
                    status = ?status,
                    "Transaction updated from webhook"
                );
                HandlerOutcome::Handled
            }
            Ok(false) => HandlerOutcome::Failed(format!(
                "no local transaction references gateway id {}",
                gateway_id
            )),
            Err(e) => HandlerOutcome::Failed(e.to_string()),
        }
    }

    /// Fraud alerts and chargebacks do not change the local status; they are
    /// surfaced for out-of-band review against the referenced transaction.
    async fn flag_transaction(&self, event: &WebhookEvent, reason: &str) -> HandlerOutcome {
        let Some(ref gateway_id) = event.transaction_id else {
            return HandlerOutcome::Failed("event carried no transaction id".to_string());
        };

        tracing::warn!(
            gateway_transaction_id = %gateway_id,
            reason = %reason,
            payload = %event.payload,
            "Gateway risk notification received"
        );
        HandlerOutcome::Handled
    }
}
