pub mod company;
pub mod metrics;
pub mod tracing;
