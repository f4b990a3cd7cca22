#![allow(dead_code)]

use async_trait::async_trait;
use expense_service::config::{Config, DatabaseConfig, MondayConfig, ServerConfig};
use expense_service::models::{ColumnMapping, Company, Expense, ExpenseDelta, SyncCounts};
use expense_service::services::{ExpenseStore, MondayClient, SyncEngine};
use expense_service::AppState;
use mongodb::bson::DateTime;
use secrecy::Secret;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_COMPANY_ID: &str = "c1";
pub const TEST_BOARD_ID: &str = "b1";

/// In-memory double for the expense store.
#[derive(Default)]
pub struct InMemoryExpenseStore {
    pub expenses: Mutex<Vec<Expense>>,
    pub companies: Mutex<HashMap<String, Company>>,
}

impl InMemoryExpenseStore {
    pub fn with_company(company: Company) -> Arc<Self> {
        let store = Self::default();
        store
            .companies
            .lock()
            .unwrap()
            .insert(company.id.clone(), company);
        Arc::new(store)
    }

    pub fn expense(&self, external_item_id: &str) -> Option<Expense> {
        self.expenses
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.external_item_id.as_deref() == Some(external_item_id))
            .cloned()
    }

    pub fn expense_count(&self) -> usize {
        self.expenses.lock().unwrap().len()
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn find_by_external_id(
        &self,
        company_id: &str,
        external_item_id: &str,
    ) -> Result<Option<Expense>, AppError> {
        Ok(self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.company_id == company_id
                    && e.external_item_id.as_deref() == Some(external_item_id)
            })
            .cloned())
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), AppError> {
        self.expenses.lock().unwrap().push(expense);
        Ok(())
    }

    async fn apply_delta(
        &self,
        company_id: &str,
        external_item_id: &str,
        delta: &ExpenseDelta,
    ) -> Result<(), AppError> {
        let mut expenses = self.expenses.lock().unwrap();
        if let Some(expense) = expenses.iter_mut().find(|e| {
            e.company_id == company_id && e.external_item_id.as_deref() == Some(external_item_id)
        }) {
            if let Some(amount) = delta.amount {
                expense.amount = amount;
            }
            if let Some(status) = delta.status {
                expense.status = status;
            }
            if let Some(category) = delta.category {
                expense.category = category;
            }
            if let Some(date) = delta.expense_date {
                expense.expense_date = Some(date);
            }
            if let Some(ref vendor) = delta.vendor {
                expense.vendor = Some(vendor.clone());
            }
            if let Some(ref notes) = delta.notes {
                expense.notes = Some(notes.clone());
            }
            expense.updated_at = DateTime::now();
        }
        Ok(())
    }

    async fn get_company(&self, company_id: &str) -> Result<Option<Company>, AppError> {
        Ok(self.companies.lock().unwrap().get(company_id).cloned())
    }

    async fn save_column_mapping(
        &self,
        company_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<(), AppError> {
        let mut companies = self.companies.lock().unwrap();
        let company = companies.entry(company_id.to_string()).or_insert(Company {
            id: company_id.to_string(),
            board_id: None,
            column_mapping: None,
            last_sync_at: None,
            last_sync_counts: None,
        });
        company.column_mapping = Some(mapping.clone());
        Ok(())
    }

    async fn record_sync(
        &self,
        company_id: &str,
        counts: SyncCounts,
        at: DateTime,
    ) -> Result<(), AppError> {
        let mut companies = self.companies.lock().unwrap();
        if let Some(company) = companies.get_mut(company_id) {
            company.last_sync_at = Some(at);
            company.last_sync_counts = Some(counts);
        }
        Ok(())
    }
}

pub fn test_company(mapping: Option<ColumnMapping>) -> Company {
    Company {
        id: TEST_COMPANY_ID.to_string(),
        board_id: Some(TEST_BOARD_ID.to_string()),
        column_mapping: mapping,
        last_sync_at: None,
        last_sync_counts: None,
    }
}

/// Stored mapping matching the mocked board below.
pub fn board_mapping() -> ColumnMapping {
    serde_json::from_value(serde_json::json!({
        "amount": { "columnId": "amount_1", "columnType": "numbers" },
        "status": { "columnId": "status_1", "columnType": "status" }
    }))
    .unwrap()
}

pub fn monday_client(mock_uri: &str) -> MondayClient {
    MondayClient::new(MondayConfig {
        api_token: Secret::new("test_token".to_string()),
        api_base_url: mock_uri.to_string(),
        request_timeout_seconds: 5,
    })
    .unwrap()
}

pub fn sync_engine(mock_uri: &str, store: Arc<InMemoryExpenseStore>) -> SyncEngine {
    SyncEngine::new(monday_client(mock_uri), store)
}

pub fn test_state(mock_uri: &str, store: Arc<InMemoryExpenseStore>) -> AppState {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: Secret::new("mongodb://unused:27017".to_string()),
            db_name: "unused".to_string(),
        },
        monday: MondayConfig {
            api_token: Secret::new("test_token".to_string()),
            api_base_url: mock_uri.to_string(),
            request_timeout_seconds: 5,
        },
        service_name: "expense-service".to_string(),
    };

    let monday = monday_client(mock_uri);
    let sync_engine = SyncEngine::new(monday.clone(), store.clone());

    AppState {
        config,
        store,
        monday,
        sync_engine,
    }
}

fn item_json(id: &str, amount_text: &str, status_text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("Gasto {}", id),
        "column_values": [
            { "id": "amount_1", "text": amount_text, "value": null, "type": "numbers" },
            { "id": "status_1", "text": status_text, "value": null, "type": "status" }
        ]
    })
}

/// Mount the board-columns query response.
pub async fn mock_board_columns(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("columns { id title type }"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "boards": [{
                    "name": "Gastos",
                    "columns": [
                        { "id": "status_1", "title": "Estado", "type": "status" },
                        { "id": "amount_1", "title": "Monto", "type": "numbers" }
                    ]
                }]
            }
        })))
        .mount(server)
        .await;
}

/// Mount a single-page items response.
pub async fn mock_items_single_page(server: &MockServer, items: Vec<serde_json::Value>) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("items_page(limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "boards": [{ "items_page": { "cursor": null, "items": items } }]
            }
        })))
        .mount(server)
        .await;
}

/// Mount a two-page items response: the first page hands out a cursor, the
/// second page is served from next_items_page.
pub async fn mock_items_two_pages(
    server: &MockServer,
    first: Vec<serde_json::Value>,
    second: Vec<serde_json::Value>,
) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("next_items_page(cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "next_items_page": { "cursor": null, "items": second }
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("items_page(limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "boards": [{ "items_page": { "cursor": "page2", "items": first } }]
            }
        })))
        .mount(server)
        .await;
}

pub fn board_item(id: &str, amount_text: &str, status_text: &str) -> serde_json::Value {
    item_json(id, amount_text, status_text)
}
