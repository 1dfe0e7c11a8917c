//! Prometheus metrics for monitoring and alerting
//!
//! NOTE: We intentionally avoid user_id in metric labels to prevent
//! high-cardinality explosion that can crash Prometheus.

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Request Metrics
    // ============================================================================

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "stride_http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "endpoint", "status"]
    ).unwrap();

    /// Total HTTP requests
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("stride_http_requests_total", "Total HTTP requests"),
        &["method", "endpoint", "status"]
    ).unwrap();

    // ============================================================================
    // Assistant Dispatch Metrics
    // ============================================================================

    /// Dispatched assistant actions by action tag and result
    pub static ref DISPATCH_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("stride_dispatch_total", "Total assistant dispatches"),
        &["action", "result"]
    ).unwrap();

    /// Classifier calls by result (ok / quota / error)
    pub static ref CLASSIFY_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("stride_classify_total", "Total classifier calls"),
        &["result"]
    ).unwrap();

    /// Classifier call duration
    pub static ref CLASSIFY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "stride_classify_duration_seconds",
            "Classifier call duration"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).unwrap();

    // ============================================================================
    // Storage Metrics
    // ============================================================================

    /// Store operations by store, operation, and result
    pub static ref STORE_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("stride_store_ops_total", "Total store operations"),
        &["store", "op", "result"]
    ).unwrap();
}

/// Register all metrics with the global registry. Call once at startup.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    METRICS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    METRICS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;

    METRICS_REGISTRY.register(Box::new(DISPATCH_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(CLASSIFY_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(CLASSIFY_DURATION.clone()))?;

    METRICS_REGISTRY.register(Box::new(STORE_OPS_TOTAL.clone()))?;

    Ok(())
}

/// Record a dispatch outcome
pub fn record_dispatch(action: &str, result: &str) {
    DISPATCH_TOTAL.with_label_values(&[action, result]).inc();
}

/// Record a store operation outcome
pub fn record_store_op(store: &str, op: &str, result: &str) {
    STORE_OPS_TOTAL.with_label_values(&[store, op, result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dispatch_does_not_panic() {
        record_dispatch("CREATE_TASK", "ok");
        record_dispatch("CHAT", "ok");
        record_dispatch("EDIT_TASK", "not_found");
    }

    #[test]
    fn test_counters_accumulate() {
        let before = DISPATCH_TOTAL.with_label_values(&["LIST_TASKS", "ok"]).get();
        record_dispatch("LIST_TASKS", "ok");
        let after = DISPATCH_TOTAL.with_label_values(&["LIST_TASKS", "ok"]).get();
        assert_eq!(after, before + 1);
    }
}
