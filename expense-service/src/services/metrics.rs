use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static SYNC_PASSES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SYNC_ITEMS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let passes_counter = IntCounterVec::new(
        Opts::new(
            "expense_sync_passes_total",
            "Total sync passes by company and outcome",
        ),
        &["company_id", "outcome"],
    )
    .expect("Failed to create expense_sync_passes_total metric");

    let items_counter = IntCounterVec::new(
        Opts::new(
            "expense_sync_items_total",
            "Total reconciled items by company and action",
        ),
        &["company_id", "action"],
    )
    .expect("Failed to create expense_sync_items_total metric");

    registry
        .register(Box::new(passes_counter.clone()))
        .expect("Failed to register expense_sync_passes_total");
    registry
        .register(Box::new(items_counter.clone()))
        .expect("Failed to register expense_sync_items_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    SYNC_PASSES_TOTAL
        .set(passes_counter)
        .expect("Failed to set expense_sync_passes_total");
    SYNC_ITEMS_TOTAL
        .set(items_counter)
        .expect("Failed to set expense_sync_items_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record the outcome of one sync pass.
pub fn record_sync_pass(company_id: &str, outcome: &str) {
    if let Some(counter) = SYNC_PASSES_TOTAL.get() {
        counter.with_label_values(&[company_id, outcome]).inc();
    }
}

/// Record the reconciliation action taken for one item.
pub fn record_sync_item(company_id: &str, action: &str) {
    if let Some(counter) = SYNC_ITEMS_TOTAL.get() {
        counter.with_label_values(&[company_id, action]).inc();
    }
}
