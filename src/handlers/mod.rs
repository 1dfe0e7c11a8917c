//! HTTP layer: route table, shared state, and per-endpoint handlers.

pub mod assistant;
pub mod auth;
pub mod health;
pub mod router;
pub mod state;
pub mod support;
pub mod tasks;
pub mod types;
pub mod users;

pub use router::{build_protected_routes, build_public_routes, build_router};
pub use state::{AppContext, AppState};
pub use types::{Ack, HealthResponse, SafeUser};
