use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local record of a card payment.
///
/// The gateway owns the transaction state of record; this is a reference plus
/// the last-known status, refreshed by explicit query or webhook event.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentTransaction {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub company_id: String,
    pub user_id: Option<String>,
    /// Gateway-assigned transaction identifier; required for void/refund.
    pub gateway_transaction_id: Option<String>,
    /// Gateway correlation tag echoed on follow-up operations.
    pub gateway_transaction_tag: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub approval_code: Option<String>,
    /// Masked card descriptor, e.g. "VISA ****4242". Never the full number.
    pub card_descriptor: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Declined,
    Voided,
    Refunded,
    Failed,
}

/// Webhook event types the gateway delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    TransactionApproved,
    TransactionDeclined,
    TransactionVoided,
    TransactionRefunded,
    FraudAlert,
    Chargeback,
    Unknown(String),
}

impl WebhookEventType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "TRANSACTION_APPROVED" => Self::TransactionApproved,
            "TRANSACTION_DECLINED" => Self::TransactionDeclined,
            "TRANSACTION_VOIDED" => Self::TransactionVoided,
            "TRANSACTION_REFUNDED" => Self::TransactionRefunded,
            "FRAUD_ALERT" => Self::FraudAlert,
            "CHARGEBACK" => Self::Chargeback,
            _ => Self::Unknown(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TransactionApproved => "TRANSACTION_APPROVED",
            Self::TransactionDeclined => "TRANSACTION_DECLINED",
            Self::TransactionVoided => "TRANSACTION_VOIDED",
            Self::TransactionRefunded => "TRANSACTION_REFUNDED",
            Self::FraudAlert => "FRAUD_ALERT",
            Self::Chargeback => "CHARGEBACK",
            Self::Unknown(s) => s,
        }
    }
}

/// One asynchronous gateway notification, untrusted until its signature has
/// been verified against the raw request body.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_type: String,
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WebhookEvent {
    pub fn kind(&self) -> WebhookEventType {
        WebhookEventType::from_str(&self.event_type)
    }
}
