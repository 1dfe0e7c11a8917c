//! Shared API response types.
//!
//! Request/response structures used by more than one handler module.
//! Endpoint-specific DTOs live next to their handlers.

use serde::{Deserialize, Serialize};

use crate::store::types::User;

// =============================================================================
// HEALTH & INFRASTRUCTURE
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub users_count: usize,
}

/// Generic acknowledgement for mutations that return no payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =============================================================================
// USER PROJECTIONS
// =============================================================================

/// User fields safe to return to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub level: u32,
    pub tasks_completed: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&User> for SafeUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            level: user.level,
            tasks_completed: user.tasks_completed,
            created_at: user.created_at,
        }
    }
}
