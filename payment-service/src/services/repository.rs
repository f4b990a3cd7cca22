//! Transaction persistence.
//!
//! Handlers and the webhook dispatcher talk to a [`TransactionStore`] trait;
//! `MongoTransactionStore` is the production implementation.

use crate::models::{PaymentTransaction, TransactionStatus};
use crate::services::firstdata::GatewayTransaction;
use async_trait::async_trait;
use mongodb::bson::{doc, to_bson, DateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use service_core::error::AppError;
use uuid::Uuid;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), AppError>;

    async fn get(
        &self,
        company_id: &str,
        id: Uuid,
    ) -> Result<Option<PaymentTransaction>, AppError>;

    /// Update the last-known status from a gateway read.
    async fn update_from_gateway(
        &self,
        company_id: &str,
        id: Uuid,
        gateway: &GatewayTransaction,
    ) -> Result<(), AppError>;

    /// Update status by gateway transaction id; returns false when no local
    /// record references that gateway transaction.
    async fn update_status_by_gateway_id(
        &self,
        gateway_id: &str,
        status: TransactionStatus,
    ) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct MongoTransactionStore {
    collection: Collection<PaymentTransaction>,
}

impl MongoTransactionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("transactions"),
        }
    }

    /// Initialize database indexes.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let company_idx = IndexModel::builder()
            .keys(doc! { "company_id": 1, "_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("company_transaction_idx".to_string())
                    .build(),
            )
            .build();

        // Webhook events arrive keyed by the gateway's identifier.
        let gateway_idx = IndexModel::builder()
            .keys(doc! { "gateway_transaction_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("gateway_transaction_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([company_idx, gateway_idx], None)
            .await?;

        tracing::info!("Payment service indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for MongoTransactionStore {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), AppError> {
        self.collection.insert_one(transaction, None).await?;
        Ok(())
    }

    async fn get(
        &self,
        company_id: &str,
        id: Uuid,
    ) -> Result<Option<PaymentTransaction>, AppError> {
        let transaction = self
            .collection
            .find_one(doc! { "company_id": company_id, "_id": to_uuid_bson(id)? }, None)
            .await?;
        Ok(transaction)
    }

    async fn update_from_gateway(
        &self,
        company_id: &str,
        id: Uuid,
        gateway: &GatewayTransaction,
    ) -> Result<(), AppError> {
        let status = to_bson(&gateway.status)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        self.collection
            .update_one(
                doc! { "company_id": company_id, "_id": to_uuid_bson(id)? },
                doc! { "$set": {
                    "status": status,
                    "approval_code": gateway.approval_code.clone(),
                    "updated_at": DateTime::now(),
                }},
                None,
            )
            .await?;
        Ok(())
    }

    async fn update_status_by_gateway_id(
        &self,
        gateway_id: &str,
        status: TransactionStatus,
    ) -> Result<bool, AppError> {
        let status_bson =
            to_bson(&status).map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        let result = self
            .collection
            .update_one(
                doc! { "gateway_transaction_id": gateway_id },
                doc! { "$set": { "status": status_bson, "updated_at": DateTime::now() } },
                None,
            )
            .await?;

        Ok(result.matched_count > 0)
    }
}

fn to_uuid_bson(id: Uuid) -> Result<mongodb::bson::Bson, AppError> {
    to_bson(&id).map_err(|e| AppError::InternalError(anyhow::Error::new(e)))
}
