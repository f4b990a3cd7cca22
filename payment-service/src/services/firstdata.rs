//! First Data (Fiserv) payment gateway client.
//!
//! Wraps the gateway's signed-request transaction API: sale, void, refund and
//! status query. Every request is authenticated with an HMAC-SHA256 over
//! `api_key + nonce + timestamp + merchant_id + body`, and the gateway's
//! heterogeneous success/error shapes are normalized into one result type.

use crate::config::FirstDataConfig;
use crate::models::TransactionStatus;
use anyhow::Result;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::utils::signature::generate_signature;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct FirstDataClient {
    client: Client,
    config: FirstDataConfig,
}

/// Card details for a sale. Request-scoped only; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
    pub cardholder_name: String,
}

impl CardDetails {
    /// Masked descriptor safe to store and display, e.g. "****4242".
    pub fn descriptor(&self) -> String {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        let last4 = if digits.len() >= 4 {
            &digits[digits.len() - 4..]
        } else {
            digits.as_str()
        };
        format!("****{}", last4)
    }
}

/// Normalized, gateway-owned view of one transaction.
#[derive(Debug, Clone)]
pub struct GatewayTransaction {
    pub transaction_id: String,
    pub transaction_tag: Option<String>,
    pub status: TransactionStatus,
    pub amount: f64,
    pub currency: String,
    pub approval_code: Option<String>,
    pub card_descriptor: Option<String>,
}

/// Outcome of a sale attempt. A decline is a domain result, not an error.
#[derive(Debug, Clone)]
pub enum ChargeOutcome {
    Approved(GatewayTransaction),
    Declined {
        error_code: String,
        error_message: String,
    },
}

#[derive(Debug, Serialize)]
struct TransactionRequest<'a> {
    transaction_type: &'a str,
    merchant_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credit_card: Option<CreditCardPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct CreditCardPayload<'a> {
    cardholder_name: &'a str,
    card_number: &'a str,
    exp_date: String,
    cvv: &'a str,
}

/// Raw gateway response. Success and error shapes share one loose structure;
/// absent fields decide which one arrived.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    transaction_id: Option<String>,
    transaction_tag: Option<String>,
    transaction_status: Option<String>,
    amount: Option<String>,
    currency_code: Option<String>,
    approval_code: Option<String>,
    bank_resp_code: Option<String>,
    card: Option<GatewayCard>,
    error_code: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayCard {
    #[serde(rename = "type")]
    card_type: Option<String>,
    masked_card_number: Option<String>,
}

/// Translate a gateway response code into a caller-facing message. Raw
/// gateway internals never reach the end user.
pub fn decline_message(code: &str) -> &'static str {
    match code {
        "301" => "Card issuer unavailable, try again later",
        "302" => "Insufficient funds",
        "303" => "Payment declined by processor",
        "304" => "Card type not supported",
        "401" => "Card expired",
        "402" => "Invalid card number",
        "403" => "Invalid expiration date",
        "404" => "Invalid security code",
        "501" => "Transaction declined, suspected fraud",
        "502" => "Card reported lost or stolen",
        _ => "Payment could not be processed",
    }
}

fn parse_gateway_status(raw: &str) -> TransactionStatus {
    match raw.to_lowercase().as_str() {
        "approved" => TransactionStatus::Approved,
        "declined" => TransactionStatus::Declined,
        "voided" => TransactionStatus::Voided,
        "refunded" => TransactionStatus::Refunded,
        "pending" => TransactionStatus::Pending,
        _ => TransactionStatus::Failed,
    }
}

/// Amounts travel as minor units (cents) on the wire.
fn to_minor_units(amount: f64) -> String {
    format!("{}", (amount * 100.0).round() as i64)
}

fn from_minor_units(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.parse::<i64>().ok())
        .map(|cents| cents as f64 / 100.0)
        .unwrap_or(0.0)
}

impl FirstDataClient {
    pub fn new(config: FirstDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    /// Check if the gateway is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Issue a sale for `amount` in major units.
    pub async fn charge(
        &self,
        amount: f64,
        currency: &str,
        card: &CardDetails,
    ) -> Result<ChargeOutcome, AppError> {
        let body = TransactionRequest {
            transaction_type: "purchase",
            merchant_ref: Uuid::new_v4().to_string(),
            amount: Some(to_minor_units(amount)),
            currency_code: Some(currency),
            credit_card: Some(CreditCardPayload {
                cardholder_name: &card.cardholder_name,
                card_number: &card.number,
                exp_date: format!("{}{}", card.exp_month, card.exp_year),
                cvv: &card.cvv,
            }),
        };

        let response = self.post("/v1/transactions", &body).await?;

        match response.transaction_status.as_deref() {
            Some(status) if status.eq_ignore_ascii_case("approved") => {
                let transaction = self.normalize(response)?;
                tracing::info!(
                    transaction_id = %transaction.transaction_id,
                    amount = transaction.amount,
                    currency = %transaction.currency,
                    "Gateway sale approved"
                );
                Ok(ChargeOutcome::Approved(transaction))
            }
            _ => {
                let code = response
                    .bank_resp_code
                    .or(response.error_code)
                    .unwrap_or_else(|| "unknown".to_string());
                let message = decline_message(&code).to_string();
                tracing::warn!(error_code = %code, "Gateway sale declined");
                Ok(ChargeOutcome::Declined {
                    error_code: code,
                    error_message: message,
                })
            }
        }
    }

    /// Void a prior transaction. The gateway rejects voids on settled or
    /// unknown transactions; those surface as domain errors.
    pub async fn void_transaction(
        &self,
        gateway_id: &str,
    ) -> Result<GatewayTransaction, AppError> {
        let body = TransactionRequest {
            transaction_type: "void",
            merchant_ref: Uuid::new_v4().to_string(),
            amount: None,
            currency_code: None,
            credit_card: None,
        };

        let response = self
            .post(&format!("/v1/transactions/{}", gateway_id), &body)
            .await?;
        self.normalize(response)
    }

    /// Refund a prior transaction; partial when `amount` is provided, full
    /// when omitted. Amount bounds are the caller's responsibility - the
    /// handler validates against the original before any gateway call.
    pub async fn refund(
        &self,
        gateway_id: &str,
        amount: Option<f64>,
    ) -> Result<GatewayTransaction, AppError> {
        let body = TransactionRequest {
            transaction_type: "refund",
            merchant_ref: Uuid::new_v4().to_string(),
            amount: amount.map(to_minor_units),
            currency_code: None,
            credit_card: None,
        };

        let response = self
            .post(&format!("/v1/transactions/{}", gateway_id), &body)
            .await?;
        self.normalize(response)
    }

    /// Read-only status query, used for polling and webhook cross-checks.
    pub async fn get_transaction(
        &self,
        gateway_id: &str,
    ) -> Result<GatewayTransaction, AppError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/transactions/{}", gateway_id),
                String::new(),
            )
            .await?;
        self.normalize(response)
    }

    fn normalize(&self, response: GatewayResponse) -> Result<GatewayTransaction, AppError> {
        let transaction_id = response.transaction_id.ok_or_else(|| {
            AppError::BadGateway("gateway response carried no transaction id".to_string())
        })?;

        let card_descriptor = response.card.and_then(|c| {
            c.masked_card_number
                .map(|masked| match c.card_type {
                    Some(t) => format!("{} {}", t, masked),
                    None => masked,
                })
        });

        Ok(GatewayTransaction {
            transaction_id,
            transaction_tag: response.transaction_tag,
            status: response
                .transaction_status
                .as_deref()
                .map(parse_gateway_status)
                .unwrap_or(TransactionStatus::Failed),
            amount: from_minor_units(response.amount.as_deref()),
            currency: response.currency_code.unwrap_or_else(|| "USD".to_string()),
            approval_code: response.approval_code,
            card_descriptor,
        })
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<GatewayResponse, AppError> {
        let payload = serde_json::to_string(body)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        self.request(reqwest::Method::POST, path, payload).await
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        payload: String,
    ) -> Result<GatewayResponse, AppError> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "First Data gateway credentials not configured"
            )));
        }

        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let nonce = Uuid::new_v4().to_string();
        let authorization = self.sign(&timestamp, &nonce, &payload)?;

        let url = format!("{}{}", self.config.api_base_url, path);
        let mut request = self
            .client
            .request(method, &url)
            .header("Api-Key", self.config.api_key.expose_secret())
            .header("Merchant-Id", &self.config.merchant_id)
            .header("Timestamp", &timestamp)
            .header("Nonce", &nonce)
            .header("Authorization", &authorization);

        if !payload.is_empty() {
            request = request
                .header("Content-Type", "application/json")
                .body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("gateway unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::BadGateway(format!("gateway read failed: {}", e)))?;

        tracing::debug!(status = %status, "Gateway response received");

        let parsed: GatewayResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(status = %status, body = %body, "Unparsable gateway response");
            AppError::BadGateway(format!("unexpected gateway response: {}", e))
        })?;

        if status.is_success() {
            return Ok(parsed);
        }

        // 4xx means the operation itself was rejected (invalid or expired
        // transaction); keep it a domain error for the caller.
        if status.is_client_error() {
            let message = parsed
                .error_message
                .unwrap_or_else(|| "transaction cannot be processed".to_string());
            tracing::warn!(status = %status, message = %message, "Gateway rejected operation");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Gateway rejected the operation: {}",
                message
            )));
        }

        tracing::error!(status = %status, "Gateway error");
        Err(AppError::BadGateway(format!("gateway returned {}", status)))
    }

    /// `HMAC-SHA256(api_key + nonce + timestamp + merchant_id + body, api_secret)`
    fn sign(&self, timestamp: &str, nonce: &str, payload: &str) -> Result<String, AppError> {
        let message = format!(
            "{}{}{}{}{}",
            self.config.api_key.expose_secret(),
            nonce,
            timestamp,
            self.config.merchant_id,
            payload
        );
        generate_signature(self.config.api_secret.expose_secret(), &message)
            .map_err(AppError::InternalError)
    }
}
