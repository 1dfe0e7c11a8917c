//! Action dispatch: classified intent to store mutation to narrative
//!
//! One dispatch is a fixed sequence: validate the message, load the
//! caller, classify, append the user turn, run the action branch, append
//! the assistant narrative. Pre-classification failures (empty message,
//! unknown user, quota) touch the conversation log not at all; everything
//! after classification appends exactly one user turn and exactly one
//! assistant turn, success or failure.

use axum::http::StatusCode;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::metrics::record_dispatch;
use crate::store::types::{Activity, StatusFilter, TaskStatus, TurnRole};
use crate::store::{ConversationStore, TaskStore, UserStore};

use super::classifier::{ClassifierError, IntentClassifier};
use super::intent::{classify_value, ClassifiedIntent, TaskDraft, TaskUpdates};

/// Fallback reply when the classifier produced no usable chat text
const CHAT_FALLBACK: &str =
    "I can help you manage your activities. Try asking me to create, edit, list, or find activities!";

/// Shown when a recognized action arrived without its required fields
const UNCLEAR_REQUEST: &str =
    "I couldn't work out the details of that request. Please try rephrasing it.";

/// Transcript line for an id that resolved to nothing the caller owns
const NOT_FOUND_TRANSCRIPT: &str = "Activity not found. Please check the activity ID or title.";

/// Uniform response envelope for every dispatched action
#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub success: bool,

    /// Action tag the dispatch resolved to
    pub action: String,

    /// Operation narrative (create/edit/delete/list/find/toggle)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Free-text chat reply (CHAT only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    /// Affected activity or result list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl AssistantResponse {
    fn failure(action: &str, message: &str) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            message: Some(message.to_string()),
            reply: None,
            data: None,
        }
    }
}

/// Activity payload attached to an envelope
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    One(Box<Activity>),
    Many(Vec<Activity>),
}

/// What the HTTP layer sends back: a status code plus the envelope
#[derive(Debug)]
pub struct DispatchOutcome {
    pub status: StatusCode,
    pub body: AssistantResponse,
}

/// Result of one action branch, before the assistant turn is appended
struct BranchOutcome {
    status: StatusCode,
    body: AssistantResponse,
    transcript: String,
    result: &'static str,
}

/// How a classifier-supplied activity id resolved against the caller
enum TaskResolution {
    Owned(Activity),
    Foreign,
    Missing,
}

/// Executes classified intents against the stores and maintains the
/// per-user conversation log.
pub struct Dispatcher {
    classifier: Arc<dyn IntentClassifier>,
    tasks: Arc<TaskStore>,
    users: Arc<UserStore>,
    conversations: Arc<ConversationStore>,
}

impl Dispatcher {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        tasks: Arc<TaskStore>,
        users: Arc<UserStore>,
        conversations: Arc<ConversationStore>,
    ) -> Self {
        Self {
            classifier,
            tasks,
            users,
            conversations,
        }
    }

    /// Run one message through classify, normalize, branch.
    pub async fn dispatch(&self, user_id: &str, message: &str) -> Result<DispatchOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::MissingMessage);
        }

        let user = self
            .users
            .get(user_id)
            .map_err(|e| AppError::StorageError(e.to_string()))?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        let current_tasks = self
            .tasks
            .list_tasks(user_id, None)
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        let raw = match self.classifier.classify(message, &user, &current_tasks).await {
            Ok(raw) => raw,
            Err(ClassifierError::Quota) => return Err(AppError::QuotaExceeded),
            Err(e) => return Err(AppError::ClassifierFailed(e.to_string())),
        };

        // First of the two turns this dispatch owes the transcript
        self.conversations
            .append_turn(user_id, TurnRole::User, message.to_string())
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        let outcome = match classify_value(&raw) {
            Ok(intent) => {
                let action = intent.action();
                match self.run_branch(user_id, intent) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(action = action, error = %e, "Dispatch branch failed");
                        let failure = branch_failure_message(action);
                        BranchOutcome {
                            status: StatusCode::INTERNAL_SERVER_ERROR,
                            body: AssistantResponse::failure(action, failure),
                            transcript: failure.to_string(),
                            result: "error",
                        }
                    }
                }
            }
            Err(bad) => {
                tracing::warn!(
                    action = %bad.action,
                    reason = %bad.reason,
                    "Classifier output missing required fields"
                );
                BranchOutcome {
                    status: StatusCode::BAD_REQUEST,
                    body: AssistantResponse::failure(&bad.action, UNCLEAR_REQUEST),
                    transcript: UNCLEAR_REQUEST.to_string(),
                    result: "invalid",
                }
            }
        };

        // Second turn: the narrative, whatever the branch decided
        self.conversations
            .append_turn(user_id, TurnRole::Assistant, outcome.transcript)
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        record_dispatch(&outcome.body.action, outcome.result);

        Ok(DispatchOutcome {
            status: outcome.status,
            body: outcome.body,
        })
    }

    fn run_branch(&self, user_id: &str, intent: ClassifiedIntent) -> anyhow::Result<BranchOutcome> {
        match intent {
            ClassifiedIntent::CreateTask { draft } => self.run_create(user_id, draft),
            ClassifiedIntent::EditTask { task_id, updates } => {
                self.run_edit(user_id, &task_id, updates)
            }
            ClassifiedIntent::DeleteTask { task_id } => self.run_delete(user_id, &task_id),
            ClassifiedIntent::ListTasks { filter } => self.run_list(user_id, filter),
            ClassifiedIntent::FindTask { query } => self.run_find(user_id, &query),
            ClassifiedIntent::ToggleComplete { task_id } => self.run_toggle(user_id, &task_id),
            ClassifiedIntent::Chat { reply } => Ok(chat_outcome(reply)),
        }
    }

    /// Resolve an activity id for a mutating branch. Foreign ids are kept
    /// apart from missing ones for logging and metrics even though both
    /// surface to the user as the same not-found narrative.
    fn resolve(&self, user_id: &str, task_id: &str) -> anyhow::Result<TaskResolution> {
        if let Some(task) = self.tasks.get_task(user_id, task_id)? {
            return Ok(TaskResolution::Owned(task));
        }

        match self.tasks.owner_of(task_id)? {
            Some(owner) if owner != user_id => {
                tracing::warn!(
                    user_id = %user_id,
                    task_id = %task_id,
                    "Blocked access to another user's activity"
                );
                Ok(TaskResolution::Foreign)
            }
            _ => Ok(TaskResolution::Missing),
        }
    }

    fn run_create(&self, user_id: &str, draft: TaskDraft) -> anyhow::Result<BranchOutcome> {
        let mut task = Activity::new(user_id.to_string(), draft.title, draft.description);
        task.improved_text = draft.improved_text;
        task.priority = draft.priority;
        task.steps = draft.steps;
        task.time_estimate = draft.time_estimate;
        task.due_date = draft.due_date;
        task.status = draft.status;

        self.tasks.store_task(&task)?;

        // Back-reference on the owner
        if let Some(mut user) = self.users.get(user_id)? {
            user.tasks.push(task.id.to_string());
            self.users.update(&user)?;
        }

        tracing::info!(user_id = %user_id, task_id = %task.id, "Assistant created activity");

        Ok(BranchOutcome {
            status: StatusCode::CREATED,
            transcript: format!("Activity created: {}", task.title),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "CREATE_TASK".to_string(),
                message: Some(format!("Activity \"{}\" created successfully!", task.title)),
                reply: None,
                data: Some(ResponseData::One(Box::new(task))),
            },
        })
    }

    fn run_edit(
        &self,
        user_id: &str,
        task_id: &str,
        updates: TaskUpdates,
    ) -> anyhow::Result<BranchOutcome> {
        let mut task = match self.resolve(user_id, task_id)? {
            TaskResolution::Owned(task) => task,
            TaskResolution::Foreign => return Ok(not_found_outcome("EDIT_TASK", "forbidden")),
            TaskResolution::Missing => return Ok(not_found_outcome("EDIT_TASK", "not_found")),
        };

        if let Some(title) = updates.title {
            task.title = title;
        }
        if let Some(description) = updates.description {
            task.description = description;
        }
        if let Some(priority) = updates.priority {
            task.priority = priority;
        }
        if let Some(due_date) = updates.due_date {
            task.due_date = Some(due_date);
        }
        task.updated_at = chrono::Utc::now();

        self.tasks.update_task(&task)?;

        let message = format!("Activity \"{}\" updated successfully!", task.title);

        Ok(BranchOutcome {
            status: StatusCode::OK,
            transcript: message.clone(),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "EDIT_TASK".to_string(),
                message: Some(message),
                reply: None,
                data: Some(ResponseData::One(Box::new(task))),
            },
        })
    }

    fn run_delete(&self, user_id: &str, task_id: &str) -> anyhow::Result<BranchOutcome> {
        let task = match self.resolve(user_id, task_id)? {
            TaskResolution::Owned(task) => task,
            TaskResolution::Foreign => return Ok(not_found_outcome("DELETE_TASK", "forbidden")),
            TaskResolution::Missing => return Ok(not_found_outcome("DELETE_TASK", "not_found")),
        };

        self.tasks.delete_task(user_id, task_id)?;

        if let Some(mut user) = self.users.get(user_id)? {
            user.tasks.retain(|id| id.as_str() != task_id);
            self.users.update(&user)?;
        }

        tracing::info!(user_id = %user_id, task_id = %task_id, "Assistant deleted activity");

        let message = format!("Activity \"{}\" deleted successfully!", task.title);

        Ok(BranchOutcome {
            status: StatusCode::OK,
            transcript: message.clone(),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "DELETE_TASK".to_string(),
                message: Some(message),
                reply: None,
                data: None,
            },
        })
    }

    fn run_list(
        &self,
        user_id: &str,
        filter: Option<StatusFilter>,
    ) -> anyhow::Result<BranchOutcome> {
        let tasks = self.tasks.list_tasks(user_id, filter)?;

        let phrase = filter_phrase(filter);
        let message = if tasks.is_empty() {
            format!("You don't have any {phrase}activities yet.")
        } else {
            format!(
                "Here are your {phrase}activities ({} total):\n\n{}",
                tasks.len(),
                format_activity_lines(&tasks)
            )
        };

        Ok(BranchOutcome {
            status: StatusCode::OK,
            transcript: message.clone(),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "LIST_TASKS".to_string(),
                message: Some(message),
                reply: None,
                data: Some(ResponseData::Many(tasks)),
            },
        })
    }

    fn run_find(&self, user_id: &str, query: &str) -> anyhow::Result<BranchOutcome> {
        let matches = self.tasks.search_tasks(user_id, query)?;

        let message = if matches.is_empty() {
            format!("No activities found matching \"{query}\". Try different keywords.")
        } else {
            format!(
                "Found {} activities matching \"{query}\":\n\n{}",
                matches.len(),
                format_activity_lines(&matches)
            )
        };

        Ok(BranchOutcome {
            status: StatusCode::OK,
            transcript: message.clone(),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "FIND_TASK".to_string(),
                message: Some(message),
                reply: None,
                data: Some(ResponseData::Many(matches)),
            },
        })
    }

    fn run_toggle(&self, user_id: &str, task_id: &str) -> anyhow::Result<BranchOutcome> {
        let mut task = match self.resolve(user_id, task_id)? {
            TaskResolution::Owned(task) => task,
            TaskResolution::Foreign => {
                return Ok(not_found_outcome("TOGGLE_COMPLETE", "forbidden"))
            }
            TaskResolution::Missing => {
                return Ok(not_found_outcome("TOGGLE_COMPLETE", "not_found"))
            }
        };

        let completing = !task.status.is_completed();
        task.status = TaskStatus::from_completed(completing);
        task.updated_at = chrono::Utc::now();

        self.tasks.update_task(&task)?;

        // Leveling is a secondary effect; its failure never fails the toggle
        if completing {
            match self.users.record_completion(user_id) {
                Ok(outcome) if outcome.leveled_up => {
                    tracing::info!(user_id = %user_id, level = outcome.level, "User leveled up");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to record completion")
                }
            }
        } else if let Err(e) = self.users.revert_completion(user_id) {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to revert completion");
        }

        let status_word = if completing { "completed" } else { "reopened" };
        let message = format!("Activity \"{}\" {status_word} successfully!", task.title);

        Ok(BranchOutcome {
            status: StatusCode::OK,
            transcript: message.clone(),
            result: "ok",
            body: AssistantResponse {
                success: true,
                action: "TOGGLE_COMPLETE".to_string(),
                message: Some(message),
                reply: None,
                data: Some(ResponseData::One(Box::new(task))),
            },
        })
    }
}

fn chat_outcome(reply: Option<String>) -> BranchOutcome {
    let reply = reply.unwrap_or_else(|| CHAT_FALLBACK.to_string());

    BranchOutcome {
        status: StatusCode::OK,
        transcript: reply.clone(),
        result: "ok",
        body: AssistantResponse {
            success: true,
            action: "CHAT".to_string(),
            message: None,
            reply: Some(reply),
            data: None,
        },
    }
}

fn not_found_outcome(action: &str, result: &'static str) -> BranchOutcome {
    BranchOutcome {
        status: StatusCode::NOT_FOUND,
        body: AssistantResponse::failure(action, "Activity not found"),
        transcript: NOT_FOUND_TRANSCRIPT.to_string(),
        result,
    }
}

/// Filter word with its trailing space, or nothing when unfiltered
fn filter_phrase(filter: Option<StatusFilter>) -> &'static str {
    match filter {
        Some(StatusFilter::Completed) => "completed ",
        Some(StatusFilter::Pending) => "pending ",
        None => "",
    }
}

fn format_activity_lines(tasks: &[Activity]) -> String {
    tasks
        .iter()
        .map(|task| {
            format!(
                "• {} ({}) - {} priority",
                task.title,
                task.status.label(),
                task.priority
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn branch_failure_message(action: &str) -> &'static str {
    match action {
        "CREATE_TASK" => "Failed to create activity",
        "EDIT_TASK" => "Failed to update activity",
        "DELETE_TASK" => "Failed to delete activity",
        "LIST_TASKS" => "Failed to retrieve activities",
        "FIND_TASK" => "Failed to search activities",
        "TOGGLE_COMPLETE" => "Failed to update activity status",
        _ => "Failed to process message",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_lines_format() {
        let mut urgent = Activity::new("u".to_string(), "Ship it".to_string(), String::new());
        urgent.priority = crate::store::types::TaskPriority::High;
        urgent.status = TaskStatus::Completed;
        let routine = Activity::new("u".to_string(), "Water plants".to_string(), String::new());

        let lines = format_activity_lines(&[urgent, routine]);
        assert_eq!(
            lines,
            "• Ship it (Completed) - High priority\n• Water plants (Pending) - Medium priority"
        );
    }

    #[test]
    fn test_filter_phrase_spacing() {
        assert_eq!(filter_phrase(None), "");
        assert_eq!(filter_phrase(Some(StatusFilter::Pending)), "pending ");
        assert_eq!(filter_phrase(Some(StatusFilter::Completed)), "completed ");
    }

    #[test]
    fn test_chat_fallback_when_reply_absent() {
        let outcome = chat_outcome(None);
        assert_eq!(outcome.body.reply.as_deref(), Some(CHAT_FALLBACK));
        assert_eq!(outcome.transcript, CHAT_FALLBACK);

        let outcome = chat_outcome(Some("Sure thing.".to_string()));
        assert_eq!(outcome.body.reply.as_deref(), Some("Sure thing."));
    }

    #[test]
    fn test_branch_failure_messages_cover_actions() {
        assert_eq!(branch_failure_message("CREATE_TASK"), "Failed to create activity");
        assert_eq!(
            branch_failure_message("TOGGLE_COMPLETE"),
            "Failed to update activity status"
        );
        assert_eq!(branch_failure_message("???"), "Failed to process message");
    }
}
