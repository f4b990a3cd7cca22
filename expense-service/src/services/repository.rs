//! Expense persistence.
//!
//! The sync engine talks to an [`ExpenseStore`] trait so it can run against
//! an in-memory double in tests; `MongoExpenseStore` is the production
//! implementation.

use crate::models::{ColumnMapping, Company, Expense, ExpenseDelta, SyncCounts};
use async_trait::async_trait;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use service_core::error::AppError;

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        company_id: &str,
        external_item_id: &str,
    ) -> Result<Option<Expense>, AppError>;

    async fn insert_expense(&self, expense: Expense) -> Result<(), AppError>;

    /// Apply a field-level change set to one synced expense. Writes are
    /// per-item so a crash mid-pass leaves earlier items durably updated.
    async fn apply_delta(
        &self,
        company_id: &str,
        external_item_id: &str,
        delta: &ExpenseDelta,
    ) -> Result<(), AppError>;

    async fn get_company(&self, company_id: &str) -> Result<Option<Company>, AppError>;

    async fn save_column_mapping(
        &self,
        company_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<(), AppError>;

    async fn record_sync(
        &self,
        company_id: &str,
        counts: SyncCounts,
        at: DateTime,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoExpenseStore {
    expense_collection: Collection<Expense>,
    company_collection: Collection<Company>,
}

impl MongoExpenseStore {
    pub fn new(db: &Database) -> Self {
        Self {
            expense_collection: db.collection("expenses"),
            company_collection: db.collection("companies"),
        }
    }

    /// Initialize database indexes.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        // Unique index on (company_id, external_item_id) backs the invariant
        // that at most one expense maps to a given board item per company.
        // Partial: locally-created expenses have no external item id.
        let external_idx = IndexModel::builder()
            .keys(doc! { "company_id": 1, "external_item_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("company_external_item_idx".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! {
                        "external_item_id": { "$type": "string" }
                    })
                    .build(),
            )
            .build();

        // Index on (company_id, status) for portal listings.
        let status_idx = IndexModel::builder()
            .keys(doc! { "company_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("company_status_idx".to_string())
                    .build(),
            )
            .build();

        self.expense_collection
            .create_indexes([external_idx, status_idx], None)
            .await?;

        tracing::info!("Expense service indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for MongoExpenseStore {
    async fn find_by_external_id(
        &self,
        company_id: &str,
        external_item_id: &str,
    ) -> Result<Option<Expense>, AppError> {
        let expense = self
            .expense_collection
            .find_one(
                doc! { "company_id": company_id, "external_item_id": external_item_id },
                None,
            )
            .await?;
        Ok(expense)
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), AppError> {
        self.expense_collection.insert_one(expense, None).await?;
        Ok(())
    }

    async fn apply_delta(
        &self,
        company_id: &str,
        external_item_id: &str,
        delta: &ExpenseDelta,
    ) -> Result<(), AppError> {
        let mut set = mongodb::bson::to_document(delta)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        set.insert("updated_at", DateTime::now());

        self.expense_collection
            .update_one(
                doc! { "company_id": company_id, "external_item_id": external_item_id },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(())
    }

    async fn get_company(&self, company_id: &str) -> Result<Option<Company>, AppError> {
        let company = self
            .company_collection
            .find_one(doc! { "_id": company_id }, None)
            .await?;
        Ok(company)
    }

    async fn save_column_mapping(
        &self,
        company_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<(), AppError> {
        let mapping_bson =
            to_bson(mapping).map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        self.company_collection
            .update_one(
                doc! { "_id": company_id },
                doc! { "$set": { "column_mapping": mapping_bson } },
                mongodb::options::UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn record_sync(
        &self,
        company_id: &str,
        counts: SyncCounts,
        at: DateTime,
    ) -> Result<(), AppError> {
        let counts_bson =
            to_bson(&counts).map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        self.company_collection
            .update_one(
                doc! { "_id": company_id },
                doc! { "$set": { "last_sync_at": at, "last_sync_counts": counts_bson } },
                mongodb::options::UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }
}
