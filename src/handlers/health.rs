//! Health and metrics endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use prometheus::Encoder;

use super::state::AppState;
use super::types::HealthResponse;
use crate::metrics::METRICS_REGISTRY;

/// GET /health - liveness probe, no auth required.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let users_count = state.user_store.count();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        users_count,
    })
}

/// GET /metrics - Prometheus exposition format.
pub async fn metrics_endpoint() -> Result<String, StatusCode> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_endpoint_encodes_registry() {
        let _ = crate::metrics::register_metrics();
        crate::metrics::record_dispatch("CHAT", "ok");

        let body = metrics_endpoint().await.unwrap();
        assert!(body.contains("stride_dispatch_total"));
    }
}
