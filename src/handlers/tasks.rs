//! Direct activity CRUD endpoints.
//!
//! These bypass the assistant and operate on the store directly. Creation is
//! lenient about optional fields; updates require the full field set so a
//! partial payload cannot silently blank out data. Mutations distinguish
//! "someone else's activity" (401) from "no such activity" (404); plain reads
//! report 404 for both so they leak nothing about other users' data.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::types::Ack;
use crate::auth::AuthUser;
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::store::types::{parse_due_date, Activity, TaskPriority, TaskStatus};
use crate::validation;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    #[serde(default)]
    pub time_estimate: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<String>>,
    #[serde(default)]
    pub time_estimate: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    pub tasks: Vec<Activity>,
    pub count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub message: String,
    pub already_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Activity>,
}

/// Loads an activity the caller owns, or reports why it cannot.
fn load_owned(state: &AppState, user_id: &str, task_id: &str) -> Result<Activity> {
    if let Some(task) = state
        .task_store
        .get_task(user_id, task_id)
        .map_err(AppError::Internal)?
    {
        return Ok(task);
    }

    match state
        .task_store
        .owner_of(task_id)
        .map_err(AppError::Internal)?
    {
        Some(owner) if owner != user_id => {
            tracing::warn!(
                user_id = %user_id,
                task_id = %task_id,
                "Blocked access to another user's activity"
            );
            Err(AppError::TaskNotOwned(task_id.to_string()))
        }
        _ => Err(AppError::TaskNotFound(task_id.to_string())),
    }
}

fn require(field: &Option<String>) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AppError::MissingFields),
    }
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Activity>)> {
    let title = require(&req.title)?;
    let description = require(&req.description)?;
    let due_raw = require(&req.due_date)?;

    validation::validate_title(&title).map_validation_err("title")?;
    validation::validate_text(&description, validation::MAX_DESCRIPTION_LENGTH)
        .map_validation_err("description")?;
    if let Some(steps) = &req.steps {
        validation::validate_steps(steps).map_validation_err("steps")?;
    }

    let due_date = parse_due_date(&due_raw).ok_or_else(|| AppError::InvalidInput {
        field: "dueDate".to_string(),
        reason: format!("unrecognized date: {due_raw}"),
    })?;

    let mut user = state
        .user_store
        .get(&auth.user_id)
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.clone()))?;

    let mut task = Activity::new(auth.user_id.clone(), title, description);
    task.due_date = Some(due_date);
    if let Some(priority) = &req.priority {
        task.priority = TaskPriority::parse_or_default(priority);
    }
    if let Some(steps) = req.steps {
        task.steps = steps;
    }
    if let Some(estimate) = req.time_estimate {
        task.time_estimate = estimate;
    }

    state.task_store.store_task(&task).map_err(AppError::Internal)?;

    user.tasks.push(task.id.to_string());
    state.user_store.update(&user).map_err(AppError::Internal)?;

    tracing::info!(user_id = %auth.user_id, task_id = %task.id, "Created activity");

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ListTasksResponse>> {
    let tasks = state
        .task_store
        .list_tasks(&auth.user_id, None)
        .map_err(AppError::Internal)?;
    let count = tasks.len();

    Ok(Json(ListTasksResponse { tasks, count }))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<Activity>> {
    validation::validate_task_id(&task_id).map_validation_err("taskId")?;

    let task = state
        .task_store
        .get_task(&auth.user_id, &task_id)
        .map_err(AppError::Internal)?
        .ok_or(AppError::TaskNotFound(task_id))?;

    Ok(Json(task))
}

/// PUT /api/tasks/{id}
///
/// Requires the complete field set. Status changes through this endpoint keep
/// the owner's completion counter in step with the activity's state.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Activity>> {
    validation::validate_task_id(&task_id).map_validation_err("taskId")?;

    let title = require(&req.title)?;
    let description = require(&req.description)?;
    let due_raw = require(&req.due_date)?;
    let priority_raw = require(&req.priority)?;
    let time_estimate = require(&req.time_estimate)?;
    let steps = match req.steps {
        Some(steps) if !steps.is_empty() => steps,
        _ => return Err(AppError::MissingFields),
    };

    validation::validate_title(&title).map_validation_err("title")?;
    validation::validate_text(&description, validation::MAX_DESCRIPTION_LENGTH)
        .map_validation_err("description")?;
    validation::validate_steps(&steps).map_validation_err("steps")?;

    let due_date = parse_due_date(&due_raw).ok_or_else(|| AppError::InvalidInput {
        field: "dueDate".to_string(),
        reason: format!("unrecognized date: {due_raw}"),
    })?;

    let mut task = load_owned(&state, &auth.user_id, &task_id)?;
    let was_completed = task.status.is_completed();

    task.title = title;
    task.description = description;
    task.due_date = Some(due_date);
    task.priority = TaskPriority::parse_or_default(&priority_raw);
    task.steps = steps;
    task.time_estimate = time_estimate;
    if let Some(status) = req.status {
        task.status = status;
    }
    task.updated_at = chrono::Utc::now();

    state.task_store.update_task(&task).map_err(AppError::Internal)?;

    let now_completed = task.status.is_completed();
    if now_completed && !was_completed {
        if let Err(e) = state.user_store.record_completion(&auth.user_id) {
            tracing::warn!(user_id = %auth.user_id, "Failed to record completion: {e}");
        }
    } else if was_completed && !now_completed {
        if let Err(e) = state.user_store.revert_completion(&auth.user_id) {
            tracing::warn!(user_id = %auth.user_id, "Failed to revert completion: {e}");
        }
    }

    Ok(Json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<Ack>> {
    validation::validate_task_id(&task_id).map_validation_err("taskId")?;

    let task = load_owned(&state, &auth.user_id, &task_id)?;

    state
        .task_store
        .delete_task(&auth.user_id, &task_id)
        .map_err(AppError::Internal)?;

    if let Some(mut user) = state
        .user_store
        .get(&auth.user_id)
        .map_err(AppError::Internal)?
    {
        user.tasks.retain(|id| id != &task_id);
        state.user_store.update(&user).map_err(AppError::Internal)?;
    }

    tracing::info!(user_id = %auth.user_id, task_id = %task.id, "Deleted activity");

    Ok(Json(Ack::ok("Activity deleted successfully")))
}

/// POST /api/tasks/{id}/complete
///
/// Completing an already-completed activity is a no-op and does not touch the
/// completion counter.
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(task_id): Path<String>,
) -> Result<Json<CompleteResponse>> {
    validation::validate_task_id(&task_id).map_validation_err("taskId")?;

    let mut task = load_owned(&state, &auth.user_id, &task_id)?;

    if task.status.is_completed() {
        return Ok(Json(CompleteResponse {
            message: "Task already completed".to_string(),
            already_completed: true,
            task: None,
        }));
    }

    task.status = TaskStatus::Completed;
    task.updated_at = chrono::Utc::now();
    state.task_store.update_task(&task).map_err(AppError::Internal)?;

    match state.user_store.record_completion(&auth.user_id) {
        Ok(outcome) if outcome.leveled_up => {
            tracing::info!(
                user_id = %auth.user_id,
                level = outcome.level,
                "User leveled up"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(user_id = %auth.user_id, "Failed to record completion: {e}");
        }
    }

    Ok(Json(CompleteResponse {
        message: "Task completed successfully".to_string(),
        already_completed: false,
        task: Some(task),
    }))
}
