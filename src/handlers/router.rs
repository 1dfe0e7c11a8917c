//! Route table construction.
//!
//! Routes are split into a public set (health, metrics, registration, login)
//! and a protected set that sits behind the bearer-token middleware.
//! `build_router` wires the two together; rate limiting, concurrency caps,
//! and CORS are layered on by the caller.

use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::Router;

use super::state::AppState;
use super::{assistant, auth, health, support, tasks, users};

/// Routes reachable without a token.
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        // ==== HEALTH & METRICS ====
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics_endpoint))
        // ==== AUTH ====
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state)
}

/// Routes that require a valid bearer token.
pub fn build_protected_routes(state: AppState) -> Router {
    Router::new()
        // ==== ACCOUNT ====
        .route("/api/user/info", get(users::get_info))
        .route("/api/user/password", put(users::change_password))
        .route("/api/user/account", delete(users::delete_account))
        .route("/api/user/level", get(users::get_level))
        // ==== ACTIVITIES ====
        .route("/api/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/complete", post(tasks::complete_task))
        // ==== ASSISTANT ====
        .route("/api/assistant/chat", post(assistant::chat))
        .route("/api/assistant/history", get(assistant::history))
        // ==== SUPPORT ====
        .route("/api/support", post(support::create_request).get(support::list_requests))
        .with_state(state)
}

/// Complete application router with auth applied to the protected set.
pub fn build_router(state: AppState) -> Router {
    let public = build_public_routes(state.clone());
    let protected =
        build_protected_routes(state).layer(from_fn(crate::auth::auth_middleware));

    Router::new().merge(public).merge(protected)
}
