//! Classifier output normalization
//!
//! The upstream model's JSON is untrusted: unknown action tags fall back
//! to chat, malformed step lists are coerced rather than rejected, and a
//! missing required field fails only the branch it belongs to.

use chrono::NaiveDate;
use serde_json::Value;

use crate::store::types::{parse_due_date, StatusFilter, TaskPriority, TaskStatus};

/// Normalized payload for creating an activity through the assistant.
///
/// Creation is deliberately lenient: absent fields default instead of
/// failing, and the step list accepts any shape (§ step normalization
/// below). Only the title is required.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub improved_text: Option<String>,
    pub priority: TaskPriority,
    pub steps: Vec<String>,
    pub time_estimate: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
}

/// Field updates for an assistant-driven edit. Absent fields are left
/// untouched on the stored activity.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdates {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

impl TaskUpdates {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

/// One dispatchable intent. Transient: lives only for a single dispatch.
#[derive(Debug, Clone)]
pub enum ClassifiedIntent {
    CreateTask { draft: TaskDraft },
    EditTask { task_id: String, updates: TaskUpdates },
    DeleteTask { task_id: String },
    ListTasks { filter: Option<StatusFilter> },
    FindTask { query: String },
    ToggleComplete { task_id: String },
    Chat { reply: Option<String> },
}

impl ClassifiedIntent {
    /// The action tag echoed back in the response envelope
    pub fn action(&self) -> &'static str {
        match self {
            ClassifiedIntent::CreateTask { .. } => "CREATE_TASK",
            ClassifiedIntent::EditTask { .. } => "EDIT_TASK",
            ClassifiedIntent::DeleteTask { .. } => "DELETE_TASK",
            ClassifiedIntent::ListTasks { .. } => "LIST_TASKS",
            ClassifiedIntent::FindTask { .. } => "FIND_TASK",
            ClassifiedIntent::ToggleComplete { .. } => "TOGGLE_COMPLETE",
            ClassifiedIntent::Chat { .. } => "CHAT",
        }
    }
}

/// A recognized action tag whose required fields are missing or unusable.
/// Fails only the branch, never the process.
#[derive(Debug, Clone)]
pub struct MalformedIntent {
    pub action: String,
    pub reason: String,
}

impl std::fmt::Display for MalformedIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.action, self.reason)
    }
}

fn malformed(action: &str, reason: &str) -> MalformedIntent {
    MalformedIntent {
        action: action.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Normalize raw classifier output into a `ClassifiedIntent`.
///
/// Unknown or missing action tags become `Chat`; a recognized tag with
/// missing required fields yields `MalformedIntent`.
pub fn classify_value(raw: &Value) -> Result<ClassifiedIntent, MalformedIntent> {
    let action = raw.get("action").and_then(|v| v.as_str()).unwrap_or("");

    match action {
        "CREATE_TASK" => {
            let task = raw
                .get("task")
                .and_then(|v| v.as_object())
                .ok_or_else(|| malformed("CREATE_TASK", "missing task payload"))?;

            let title = task
                .get("title")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| malformed("CREATE_TASK", "missing task title"))?;

            let completed = task
                .get("completed")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            let draft = TaskDraft {
                title: title.to_string(),
                description: task
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                improved_text: task
                    .get("improvedText")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                priority: task
                    .get("priority")
                    .and_then(|v| v.as_str())
                    .map(TaskPriority::parse_or_default)
                    .unwrap_or_default(),
                steps: normalize_steps(task.get("steps")),
                time_estimate: task
                    .get("timeEstimate")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                due_date: task
                    .get("dueDate")
                    .and_then(|v| v.as_str())
                    .and_then(parse_due_date),
                status: TaskStatus::from_completed(completed),
            };

            Ok(ClassifiedIntent::CreateTask { draft })
        }

        "EDIT_TASK" => {
            let task_id = non_empty_str(raw, "taskId")
                .ok_or_else(|| malformed("EDIT_TASK", "missing taskId"))?;

            let updates = raw
                .get("updates")
                .and_then(|v| v.as_object())
                .map(|obj| TaskUpdates {
                    title: obj
                        .get("title")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    description: obj
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string()),
                    priority: obj
                        .get("priority")
                        .and_then(|v| v.as_str())
                        .map(TaskPriority::parse_or_default),
                    due_date: obj
                        .get("dueDate")
                        .and_then(|v| v.as_str())
                        .and_then(parse_due_date),
                })
                .unwrap_or_default();

            Ok(ClassifiedIntent::EditTask {
                task_id: task_id.to_string(),
                updates,
            })
        }

        "DELETE_TASK" => {
            let task_id = non_empty_str(raw, "taskId")
                .ok_or_else(|| malformed("DELETE_TASK", "missing taskId"))?;

            Ok(ClassifiedIntent::DeleteTask {
                task_id: task_id.to_string(),
            })
        }

        "LIST_TASKS" => {
            let filter = raw
                .get("filter")
                .and_then(|v| v.as_str())
                .and_then(StatusFilter::from_str_loose);

            Ok(ClassifiedIntent::ListTasks { filter })
        }

        "FIND_TASK" => {
            let query = non_empty_str(raw, "searchQuery")
                .ok_or_else(|| malformed("FIND_TASK", "missing searchQuery"))?;

            Ok(ClassifiedIntent::FindTask {
                query: query.to_string(),
            })
        }

        "TOGGLE_COMPLETE" => {
            let task_id = non_empty_str(raw, "taskId")
                .ok_or_else(|| malformed("TOGGLE_COMPLETE", "missing taskId"))?;

            Ok(ClassifiedIntent::ToggleComplete {
                task_id: task_id.to_string(),
            })
        }

        // Everything else, including a missing tag, is chat
        _ => Ok(ClassifiedIntent::Chat {
            reply: raw
                .get("reply")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }),
    }
}

/// Text of one step element: `{step: "..."}` objects yield the `step`
/// field, plain strings pass through, anything else is kept as its JSON
/// rendering.
fn step_text(element: &Value) -> String {
    match element {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("step") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => element.to_string(),
            Some(other) => other.to_string(),
        },
        other => other.to_string(),
    }
}

/// Coerce whatever the classifier produced for `steps` into a step list.
///
/// A string is first tried as serialized JSON: a parsed list is used
/// element-wise, any other parse result is dropped, and a parse failure
/// keeps the whole blob as one single step. Non-list, non-string shapes
/// become the empty list. This never fails.
pub fn normalize_steps(raw: Option<&Value>) -> Vec<String> {
    let raw = match raw {
        Some(v) => v,
        None => return Vec::new(),
    };

    match raw {
        Value::Array(items) => items.iter().map(step_text).collect(),
        Value::String(blob) => match serde_json::from_str::<Value>(blob) {
            Ok(Value::Array(items)) => items.iter().map(step_text).collect(),
            Ok(_) => Vec::new(),
            Err(_) => vec![blob.clone()],
        },
        _ => Vec::new(),
    }
}
