//! service-core: Shared infrastructure for the expense portal services.
pub mod error;
pub mod middleware;
pub mod response;
pub mod utils;

pub use async_trait;
pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
