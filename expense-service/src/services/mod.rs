pub mod mapping;
pub mod metrics;
pub mod monday;
pub mod repository;
pub mod sync;
pub mod transform;

pub use metrics::{get_metrics, init_metrics};
pub use monday::MondayClient;
pub use repository::{ExpenseStore, MongoExpenseStore};
pub use sync::SyncEngine;
