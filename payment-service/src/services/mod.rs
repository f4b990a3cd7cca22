pub mod firstdata;
pub mod metrics;
pub mod repository;
pub mod webhook;

pub use firstdata::FirstDataClient;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{MongoTransactionStore, TransactionStore};
pub use webhook::WebhookDispatcher;
