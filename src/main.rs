//! Stride server binary.
//!
//! Wires configuration, storage, the intent classifier, and the HTTP layer
//! together, then serves until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tracing::info;

use stride::config::ServerConfig;
use stride::handlers::{build_protected_routes, build_public_routes, AppContext};
use stride::{auth, metrics, middleware, tracing_setup};

const DATABASE_FLUSH_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_setup::init_tracing();

    metrics::register_metrics().expect("Failed to register metrics");
    info!("📊 Metrics registered at /metrics");

    info!("🚀 Starting Stride server...");

    let server_config = ServerConfig::from_env();
    server_config.log();

    let state = Arc::new(AppContext::new(
        server_config.storage_path.clone(),
        server_config.clone(),
    )?);

    // Keep a reference for shutdown cleanup (clone BEFORE moving into router)
    let state_for_shutdown = Arc::clone(&state);

    let cors = server_config.cors.to_layer();

    // Protected API routes: auth first, then rate limiting on top
    let mut protected_routes =
        build_protected_routes(state.clone()).layer(axum::middleware::from_fn(auth::auth_middleware));

    if server_config.rate_limit_per_second > 0 {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(server_config.rate_limit_per_second)
            .burst_size(server_config.rate_limit_burst)
            .finish()
            .expect("Failed to build governor rate limiter configuration");

        protected_routes = protected_routes.layer(GovernorLayer::new(governor_conf));

        info!(
            "⚡ Rate limiting enabled: {} req/sec, burst of {}",
            server_config.rate_limit_per_second, server_config.rate_limit_burst
        );
    }

    // Public routes (health, metrics, auth) are never rate limited; probes and
    // login must stay reachable under load
    let public_routes = build_public_routes(state.clone());

    let max_concurrent = server_config.max_concurrent_requests;
    info!(
        "🔄 Concurrency limiting enabled: max_concurrent={}",
        max_concurrent
    );

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(cors);

    let addr: SocketAddr =
        format!("{}:{}", server_config.host, server_config.port).parse()?;
    info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("🔒 Shutdown signal received, flushing databases...");

    match tokio::time::timeout(
        Duration::from_secs(DATABASE_FLUSH_TIMEOUT_SECS),
        async { state_for_shutdown.flush_all() },
    )
    .await
    {
        Ok(Ok(())) => info!("✅ Databases flushed successfully"),
        Ok(Err(e)) => tracing::error!("❌ Failed to flush databases: {}", e),
        Err(_) => tracing::error!(
            "⏱️  Database flush timed out after {}s",
            DATABASE_FLUSH_TIMEOUT_SECS
        ),
    }

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received, starting graceful shutdown");
}
