//! Core domain types: users, activities, conversation logs, support requests.
//!
//! All persisted values are JSON with camelCase field names so the wire
//! format and the storage format are the same shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ACTIVITIES
// =============================================================================

/// Completion state of an activity.
///
/// This is the single canonical representation; there is no separate
/// boolean flag anywhere in storage or on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet completed
    #[default]
    Pending,
    /// Completed
    Completed,
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Display label used in assistant narratives
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Build from a completion flag (classifier payloads use a boolean)
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        }
    }
}

/// Activity priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// Parse from free text (case-insensitive); unknown values become Medium
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => TaskPriority::High,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing filter for activity queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Completed,
    Pending,
}

impl StatusFilter {
    /// Parse from free text; anything unrecognized means "no filter"
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" => Some(StatusFilter::Completed),
            "pending" | "incomplete" | "open" => Some(StatusFilter::Pending),
            _ => None,
        }
    }

    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::Completed => status.is_completed(),
            StatusFilter::Pending => !status.is_completed(),
        }
    }

    /// Filter word used in narratives ("pending", "completed")
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Completed => "completed",
            StatusFilter::Pending => "pending",
        }
    }
}

/// A user-owned activity (task/to-do item)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique identifier
    pub id: Uuid,

    /// User who owns this activity
    pub user_id: String,

    /// What needs to be done
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: String,

    /// Assistant-refined description, when one was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improved_text: Option<String>,

    /// Priority level
    #[serde(default)]
    pub priority: TaskPriority,

    /// Ordered step texts
    #[serde(default)]
    pub steps: Vec<String>,

    /// Free-text time estimate ("2 hours", "30 min")
    #[serde(default)]
    pub time_estimate: String,

    /// Due date (date only, no time component)
    pub due_date: Option<NaiveDate>,

    /// Completion state
    #[serde(default)]
    pub status: TaskStatus,

    /// When created
    pub created_at: DateTime<Utc>,

    /// When last modified
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Create a new pending activity owned by `user_id`
    pub fn new(user_id: String, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            improved_text: None,
            priority: TaskPriority::Medium,
            steps: Vec::new(),
            time_estimate: String::new(),
            due_date: None,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Parse a due date from free text.
///
/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (the date part is kept).
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

// =============================================================================
// USERS
// =============================================================================

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (UUID string, doubles as the storage key)
    pub id: String,

    /// Display name
    pub name: String,

    /// Login email (stored as given; uniqueness is case-insensitive)
    pub email: String,

    /// Argon2 PHC hash, never exposed through the API
    pub password_hash: String,

    /// Ids of owned activities (back-references maintained on create/delete)
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Lifetime completed-activity counter
    #[serde(default)]
    pub tasks_completed: u64,

    /// Current level, derived from `tasks_completed`
    #[serde(default)]
    pub level: u32,

    /// When registered
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            tasks: Vec::new(),
            tasks_completed: 0,
            level: 0,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// CONVERSATION LOGS
// =============================================================================

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message in a conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// Per-user transcript of assistant exchanges. Turns are append-only;
/// insertion order is the only ordering guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationLog {
    pub user_id: String,

    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            turns: Vec::new(),
        }
    }
}

// =============================================================================
// SUPPORT REQUESTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportCategory {
    #[default]
    General,
    Bug,
    Feature,
    Billing,
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
    #[default]
    Open,
    #[serde(rename = "in-progress")]
    InProgress,
    Resolved,
    Closed,
}

/// A support ticket filed by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub description: String,

    #[serde(default)]
    pub category: SupportCategory,

    #[serde(default)]
    pub priority: SupportPriority,

    #[serde(default)]
    pub status: SupportStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportRequest {
    pub fn new(
        user_id: String,
        subject: String,
        description: String,
        category: SupportCategory,
        priority: SupportPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            subject,
            description,
            category,
            priority,
            status: SupportStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}
