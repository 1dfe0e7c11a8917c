//! Stride Library
//!
//! Backend for a conversational task manager. Free-text messages are
//! classified into structured intents by an external LLM, dispatched against
//! the caller's activity list, and every exchange is recorded per user.
//!
//! # Key Features
//! - Intent classification with defensive normalization of model output
//! - Seven dispatchable actions (create/edit/delete/list/find/toggle/chat)
//! - RocksDB embedded storage (no external database)
//! - JWT auth with Argon2id password hashing
//! - Completion streaks drive a user level ladder

pub mod assistant;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod leveling;
pub mod metrics;
pub mod middleware;
pub mod store;
pub mod tracing_setup;
pub mod validation;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use parking_lot;
pub use uuid;
