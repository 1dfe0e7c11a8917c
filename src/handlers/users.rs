//! Account endpoints for the authenticated user.
//!
//! All handlers here run behind the auth middleware and read the caller's
//! identity from the `AuthUser` request extension.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::types::{Ack, SafeUser};
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::leveling;
use crate::validation;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelResponse {
    pub level: u32,
    pub title: String,
    pub tasks_completed: u64,
    pub next_level_at: Option<u64>,
}

/// GET /api/user/info
pub async fn get_info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SafeUser>> {
    let user = state
        .user_store
        .get(&auth.user_id)
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.clone()))?;

    Ok(Json(SafeUser::from(&user)))
}

/// PUT /api/user/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Ack>> {
    let mut user = state
        .user_store
        .get(&auth.user_id)
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.clone()))?;

    let valid = verify_password(&req.current_password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    validation::validate_password(&req.new_password).map_validation_err("newPassword")?;

    user.password_hash = hash_password(&req.new_password).map_err(AppError::Internal)?;
    state.user_store.update(&user).map_err(AppError::Internal)?;
    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(Ack::ok("Password updated successfully")))
}

/// DELETE /api/user/account
///
/// Removes the user together with every activity, conversation turn, and
/// support request they own.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Ack>> {
    let user_id = &auth.user_id;

    let removed_tasks = state
        .task_store
        .delete_all_for_user(user_id)
        .map_err(AppError::Internal)?;
    state
        .conversation_store
        .delete_for_user(user_id)
        .map_err(AppError::Internal)?;
    let removed_support = state
        .support_store
        .delete_all_for_user(user_id)
        .map_err(AppError::Internal)?;

    let existed = state
        .user_store
        .delete(user_id)
        .map_err(AppError::Internal)?;
    if !existed {
        return Err(AppError::UserNotFound(user_id.clone()));
    }

    tracing::info!(
        user_id = %user_id,
        removed_tasks,
        removed_support,
        "Account deleted"
    );

    Ok(Json(Ack::ok("Account deleted successfully")))
}

/// GET /api/user/level
pub async fn get_level(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<LevelResponse>> {
    let user = state
        .user_store
        .get(&auth.user_id)
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.clone()))?;

    let (level, title) = leveling::level_for(user.tasks_completed);

    Ok(Json(LevelResponse {
        level,
        title: title.to_string(),
        tasks_completed: user.tasks_completed,
        next_level_at: leveling::next_level_at(user.tasks_completed),
    }))
}
