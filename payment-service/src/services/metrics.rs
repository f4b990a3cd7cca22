use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static PAYMENT_TRANSACTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let transactions_counter = IntCounterVec::new(
        Opts::new(
            "payment_transactions_total",
            "Total payment transactions by company and status",
        ),
        &["company_id", "status"],
    )
    .expect("Failed to create payment_transactions_total metric");

    let webhook_counter = IntCounterVec::new(
        Opts::new(
            "payment_webhook_events_total",
            "Total webhook deliveries by event type and outcome",
        ),
        &["event_type", "outcome"],
    )
    .expect("Failed to create payment_webhook_events_total metric");

    registry
        .register(Box::new(transactions_counter.clone()))
        .expect("Failed to register payment_transactions_total");
    registry
        .register(Box::new(webhook_counter.clone()))
        .expect("Failed to register payment_webhook_events_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    PAYMENT_TRANSACTIONS_TOTAL
        .set(transactions_counter)
        .expect("Failed to set payment_transactions_total");
    WEBHOOK_EVENTS_TOTAL
        .set(webhook_counter)
        .expect("Failed to set payment_webhook_events_total");
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

/// Record a transaction outcome.
pub fn record_transaction(company_id: &str, status: &str) {
    if let Some(counter) = PAYMENT_TRANSACTIONS_TOTAL.get() {
        counter.with_label_values(&[company_id, status]).inc();
    }
}

/// Record a webhook delivery outcome.
pub fn record_webhook_event(event_type: &str, outcome: &str) {
    if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event_type, outcome]).inc();
    }
}
