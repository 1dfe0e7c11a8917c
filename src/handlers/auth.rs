//! Registration and login endpoints.
//!
//! Passwords are hashed with Argon2id before storage and never returned to
//! clients. Login issues a signed JWT carrying the user id and email.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::types::SafeUser;
use crate::auth::{hash_password, issue_token, verify_password};
use crate::errors::{AppError, Result, ValidationErrorExt};
use crate::store::types::User;
use crate::validation;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SafeUser,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SafeUser>)> {
    validation::validate_name(&req.name).map_validation_err("name")?;
    validation::validate_email(&req.email).map_validation_err("email")?;
    validation::validate_password(&req.password).map_validation_err("password")?;

    let email = req.email.trim().to_lowercase();
    if state
        .user_store
        .get_by_email(&email)
        .map_err(AppError::Internal)?
        .is_some()
    {
        return Err(AppError::EmailTaken(email));
    }

    let password_hash = hash_password(&req.password).map_err(AppError::Internal)?;
    let user = User::new(req.name.trim().to_string(), email, password_hash);

    state.user_store.create(&user).map_err(AppError::Internal)?;
    tracing::info!(user_id = %user.id, "Registered new user");

    Ok((StatusCode::CREATED, Json(SafeUser::from(&user))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .user_store
        .get_by_email(&email)
        .map_err(AppError::Internal)?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&user.id, &user.email, state.server_config.token_ttl_hours)
        .map_err(AppError::Internal)?;
    tracing::debug!(user_id = %user.id, "Login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: SafeUser::from(&user),
    }))
}
