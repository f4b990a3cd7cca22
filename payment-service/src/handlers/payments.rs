//! Payment lifecycle handlers: charge, status query, void and refund.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::company::CompanyContext;
use service_core::response::ApiResponse;
use uuid::Uuid;
use validator::Validate;

use crate::models::{PaymentTransaction, TransactionStatus};
use crate::services::firstdata::{CardDetails, ChargeOutcome};
use crate::services::metrics;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChargeRequest {
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(nested)]
    pub card: CardRequest,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CardRequest {
    #[validate(length(min = 12, max = 19))]
    pub number: String,
    #[validate(length(min = 1, max = 2))]
    pub exp_month: String,
    #[validate(length(min = 2, max = 4))]
    pub exp_year: String,
    #[validate(length(min = 3, max = 4))]
    pub cvv: String,
    #[validate(length(min = 1))]
    pub cardholder_name: String,
}

impl From<CardRequest> for CardDetails {
    fn from(c: CardRequest) -> Self {
        Self {
            number: c.number,
            exp_month: c.exp_month,
            exp_year: c.exp_year,
            cvv: c.cvv,
            cardholder_name: c.cardholder_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentActionRequest {
    pub action: String,
    pub amount: Option<f64>,
}

/// Transaction response DTO.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub gateway_transaction_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub approval_code: Option<String>,
    pub card: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(t: PaymentTransaction) -> Self {
        Self {
            id: t.id,
            gateway_transaction_id: t.gateway_transaction_id,
            amount: t.amount,
            currency: t.currency,
            status: t.status,
            approval_code: t.approval_code,
            card: t.card_descriptor,
            created_at: t.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: t.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

/// Charge a card.
///
/// Validation runs before anything touches the gateway; a decline is a
/// domain outcome carrying the mapped message, not an internal error.
pub async fn create_payment(
    State(state): State<AppState>,
    company: CompanyContext,
    Json(payload): Json<ChargeRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    if !state.gateway.is_configured() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Payment gateway is not configured for this environment"
        )));
    }

    tracing::info!(
        company_id = %company.company_id,
        amount = payload.amount,
        currency = %payload.currency,
        "Charging card"
    );

    let card: CardDetails = payload.card.into();
    let outcome = state
        .gateway
        .charge(payload.amount, &payload.currency, &card)
        .await?;

    let now = DateTime::now();
    match outcome {
        ChargeOutcome::Approved(gateway_tx) => {
            let transaction = PaymentTransaction {
                id: Uuid::new_v4(),
                company_id: company.company_id.clone(),
                user_id: company.user_id.clone(),
                gateway_transaction_id: Some(gateway_tx.transaction_id.clone()),
                gateway_transaction_tag: gateway_tx.transaction_tag.clone(),
                amount: payload.amount,
                currency: payload.currency.clone(),
                status: TransactionStatus::Approved,
                approval_code: gateway_tx.approval_code.clone(),
                card_descriptor: gateway_tx
                    .card_descriptor
                    .clone()
                    .or_else(|| Some(card.descriptor())),
                created_at: now,
                updated_at: now,
            };

            state.store.insert(transaction.clone()).await?;
            metrics::record_transaction(&company.company_id, "approved");

            tracing::info!(
                transaction_id = %transaction.id,
                gateway_transaction_id = %gateway_tx.transaction_id,
                "Payment approved"
            );

            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::ok(TransactionResponse::from(transaction))),
            )
                .into_response())
        }
        ChargeOutcome::Declined {
            error_code,
            error_message,
        } => {
            // The decline is still recorded locally for the audit trail.
            let transaction = PaymentTransaction {
                id: Uuid::new_v4(),
                company_id: company.company_id.clone(),
                user_id: company.user_id.clone(),
                gateway_transaction_id: None,
                gateway_transaction_tag: None,
                amount: payload.amount,
                currency: payload.currency.clone(),
                status: TransactionStatus::Declined,
                approval_code: None,
                card_descriptor: Some(card.descriptor()),
                created_at: now,
                updated_at: now,
            };
            state.store.insert(transaction).await?;
            metrics::record_transaction(&company.company_id, "declined");

            Ok((
                StatusCode::PAYMENT_REQUIRED,
                Json(json!({
                    "success": false,
                    "error": error_message,
                    "errorCode": error_code,
                })),
            )
                .into_response())
        }
    }
}

/// Current status of a transaction, refreshed from the gateway when the
/// local record holds a gateway id. The gateway is the state of record; a
/// failed refresh degrades to the last-known status rather than failing the
/// read.
pub async fn get_payment(
    State(state): State<AppState>,
    company: CompanyContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionResponse>>, AppError> {
    let mut transaction = state
        .store
        .get(&company.company_id, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    if let Some(gateway_id) = transaction.gateway_transaction_id.clone() {
        if state.gateway.is_configured() {
            match state.gateway.get_transaction(&gateway_id).await {
                Ok(gateway_tx) => {
                    if gateway_tx.status != transaction.status {
                        state
                            .store
                            .update_from_gateway(&company.company_id, transaction_id, &gateway_tx)
                            .await?;
                        transaction.status = gateway_tx.status;
                        transaction.approval_code = gateway_tx.approval_code;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        error = %e,
                        "Gateway refresh failed, serving last-known status"
                    );
                }
            }
        }
    }

    Ok(Json(ApiResponse::ok(TransactionResponse::from(transaction))))
}

/// Void or refund a completed transaction.
pub async fn payment_action(
    State(state): State<AppState>,
    company: CompanyContext,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<PaymentActionRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, AppError> {
    let transaction = state
        .store
        .get(&company.company_id, transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    let gateway_id = transaction.gateway_transaction_id.clone().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Transaction has no gateway reference and cannot be modified"
        ))
    })?;

    let gateway_tx = match payload.action.as_str() {
        "void" => {
            if transaction.status != TransactionStatus::Approved {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only approved transactions can be voided"
                )));
            }
            let result = state.gateway.void_transaction(&gateway_id).await?;
            metrics::record_transaction(&company.company_id, "voided");
            result
        }
        "refund" => {
            // Amount bounds are checked before any gateway call.
            if let Some(amount) = payload.amount {
                if amount <= 0.0 {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Refund amount must be positive"
                    )));
                }
                if amount > transaction.amount {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Refund amount {} exceeds original transaction amount {}",
                        amount,
                        transaction.amount
                    )));
                }
            }
            if transaction.status != TransactionStatus::Approved {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only approved transactions can be refunded"
                )));
            }
            let result = state.gateway.refund(&gateway_id, payload.amount).await?;
            metrics::record_transaction(&company.company_id, "refunded");
            result
        }
        other => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown action '{}', expected 'void' or 'refund'",
                other
            )));
        }
    };

    state
        .store
        .update_from_gateway(&company.company_id, transaction_id, &gateway_tx)
        .await?;

    tracing::info!(
        transaction_id = %transaction_id,
        action = %payload.action,
        new_status = ?gateway_tx.status,
        "Payment operation completed"
    );

    let mut updated = transaction;
    updated.status = gateway_tx.status;
    updated.approval_code = gateway_tx.approval_code;

    Ok(Json(ApiResponse::ok(TransactionResponse::from(updated))))
}
