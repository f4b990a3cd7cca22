#![allow(dead_code)]

use async_trait::async_trait;
use mongodb::bson::DateTime;
use payment_service::config::{
    Config, DatabaseConfig, FirstDataConfig, ServerConfig, WebhookConfig,
};
use payment_service::models::{PaymentTransaction, TransactionStatus};
use payment_service::services::firstdata::GatewayTransaction;
use payment_service::services::{FirstDataClient, TransactionStore, WebhookDispatcher};
use payment_service::AppState;
use secrecy::Secret;
use service_core::error::AppError;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_COMPANY_ID: &str = "c1";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// In-memory double for the transaction store.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    pub transactions: Mutex<Vec<PaymentTransaction>>,
}

impl InMemoryTransactionStore {
    pub fn with_transaction(transaction: PaymentTransaction) -> Arc<Self> {
        let store = Self::default();
        store.transactions.lock().unwrap().push(transaction);
        Arc::new(store)
    }

    pub fn transaction(&self, id: Uuid) -> Option<PaymentTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn by_gateway_id(&self, gateway_id: &str) -> Option<PaymentTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.gateway_transaction_id.as_deref() == Some(gateway_id))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), AppError> {
        self.transactions.lock().unwrap().push(transaction);
        Ok(())
    }

    async fn get(
        &self,
        company_id: &str,
        id: Uuid,
    ) -> Result<Option<PaymentTransaction>, AppError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.company_id == company_id && t.id == id)
            .cloned())
    }

    async fn update_from_gateway(
        &self,
        company_id: &str,
        id: Uuid,
        gateway: &GatewayTransaction,
    ) -> Result<(), AppError> {
        let mut transactions = self.transactions.lock().unwrap();
        if let Some(transaction) = transactions
            .iter_mut()
            .find(|t| t.company_id == company_id && t.id == id)
        {
            transaction.status = gateway.status;
            transaction.approval_code = gateway.approval_code.clone();
            transaction.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn update_status_by_gateway_id(
        &self,
        gateway_id: &str,
        status: TransactionStatus,
    ) -> Result<bool, AppError> {
        let mut transactions = self.transactions.lock().unwrap();
        match transactions
            .iter_mut()
            .find(|t| t.gateway_transaction_id.as_deref() == Some(gateway_id))
        {
            Some(transaction) => {
                transaction.status = status;
                transaction.updated_at = DateTime::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn approved_transaction(gateway_id: &str) -> PaymentTransaction {
    let now = DateTime::now();
    PaymentTransaction {
        id: Uuid::new_v4(),
        company_id: TEST_COMPANY_ID.to_string(),
        user_id: None,
        gateway_transaction_id: Some(gateway_id.to_string()),
        gateway_transaction_tag: Some("tag_1".to_string()),
        amount: 120.0,
        currency: "USD".to_string(),
        status: TransactionStatus::Approved,
        approval_code: Some("OK123".to_string()),
        card_descriptor: Some("****4242".to_string()),
        created_at: now,
        updated_at: now,
    }
}

pub fn firstdata_config(mock_uri: &str) -> FirstDataConfig {
    FirstDataConfig {
        merchant_id: "merchant_1".to_string(),
        api_key: Secret::new("key_1".to_string()),
        api_secret: Secret::new("secret_1".to_string()),
        api_base_url: mock_uri.to_string(),
        request_timeout_seconds: 5,
    }
}

pub fn gateway_client(mock_uri: &str) -> FirstDataClient {
    FirstDataClient::new(firstdata_config(mock_uri)).unwrap()
}

pub fn test_state(mock_uri: &str, store: Arc<InMemoryTransactionStore>) -> AppState {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: Secret::new("mongodb://unused:27017".to_string()),
            db_name: "unused".to_string(),
        },
        firstdata: firstdata_config(mock_uri),
        webhook: WebhookConfig {
            secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
            allow_unsigned: false,
        },
        service_name: "payment-service".to_string(),
    };

    let gateway = gateway_client(mock_uri);
    let dispatcher = WebhookDispatcher::new(store.clone());

    AppState {
        config,
        store,
        gateway,
        dispatcher,
    }
}

pub fn approved_sale_body(gateway_id: &str, amount_minor: &str) -> serde_json::Value {
    serde_json::json!({
        "transaction_id": gateway_id,
        "transaction_tag": "tag_1",
        "transaction_status": "approved",
        "amount": amount_minor,
        "currency_code": "USD",
        "approval_code": "OK123",
        "card": { "type": "VISA", "masked_card_number": "****4242" }
    })
}

/// Mount the sale endpoint with an approved response.
pub async fn mock_approved_sale(server: &MockServer, gateway_id: &str, amount_minor: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .and(body_string_contains(r#""transaction_type":"purchase""#))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(approved_sale_body(gateway_id, amount_minor)),
        )
        .mount(server)
        .await;
}

/// Mount the sale endpoint with a bank decline.
pub async fn mock_declined_sale(server: &MockServer, bank_resp_code: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "transaction_id": "tx_declined",
            "transaction_status": "declined",
            "bank_resp_code": bank_resp_code
        })))
        .mount(server)
        .await;
}

/// Mount the follow-up endpoint (void/refund) for one gateway transaction.
pub async fn mock_followup(server: &MockServer, gateway_id: &str, transaction_type: &str, new_status: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/transactions/{}", gateway_id)))
        .and(body_string_contains(format!(
            r#""transaction_type":"{}""#,
            transaction_type
        )))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "transaction_id": gateway_id,
            "transaction_tag": "tag_1",
            "transaction_status": new_status,
            "amount": "12000",
            "currency_code": "USD"
        })))
        .mount(server)
        .await;
}

/// Mount the read-only status query for one gateway transaction.
pub async fn mock_status_query(server: &MockServer, gateway_id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/transactions/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transaction_id": gateway_id,
            "transaction_status": status,
            "amount": "12000",
            "currency_code": "USD",
            "approval_code": "OK123"
        })))
        .mount(server)
        .await;
}
