//! Prometheus metrics for tera-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Status evaluations by registry and resulting status.
pub static STATUS_EVALUATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tera_status_evaluations_total",
        "Total number of record status evaluations",
        &["registry", "status"]
    )
    .expect("Failed to register status_evaluations_total")
});

/// Status changes detected on recomputation.
pub static STATUS_CHANGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tera_status_changes_total",
        "Total number of record status changes",
        &["registry", "status"]
    )
    .expect("Failed to register status_changes_total")
});

/// Record operations by registry and operation.
pub static RECORD_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tera_record_operations_total",
        "Total number of registry record operations",
        &["registry", "operation"]
    )
    .expect("Failed to register record_operations_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tera_errors_total",
        "Total number of errors by type",
        &["error_type"]  // invalid_date, not_found, database, etc.
    )
    .expect("Failed to register errors_total")
});

/// Record store operation duration histogram.
pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tera_store_operation_duration_seconds",
        "Record store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register store_operation_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&STATUS_EVALUATIONS_TOTAL);
    Lazy::force(&STATUS_CHANGES_TOTAL);
    Lazy::force(&RECORD_OPERATIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&STORE_OPERATION_DURATION);
}

pub fn record_status_evaluation(registry: &str, status: &str) {
    STATUS_EVALUATIONS_TOTAL
        .with_label_values(&[registry, status])
        .inc();
}

pub fn record_status_change(registry: &str, status: &str) {
    STATUS_CHANGES_TOTAL.with_label_values(&[registry, status]).inc();
}

pub fn record_operation(registry: &str, operation: &str) {
    RECORD_OPERATIONS_TOTAL
        .with_label_values(&[registry, operation])
        .inc();
}

pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
