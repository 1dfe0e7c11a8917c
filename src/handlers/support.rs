//! Support ticket endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::auth::AuthUser;
use crate::errors::{AppError, Result};
use crate::store::types::{SupportCategory, SupportPriority, SupportRequest};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<SupportCategory>,
    #[serde(default)]
    pub priority: Option<SupportPriority>,
}

#[derive(Serialize)]
pub struct ListSupportResponse {
    pub requests: Vec<SupportRequest>,
    pub count: usize,
}

/// POST /api/support
pub async fn create_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateSupportRequest>,
) -> Result<(StatusCode, Json<SupportRequest>)> {
    let subject = match req.subject {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(AppError::MissingFields),
    };
    let description = match req.description {
        Some(d) if !d.trim().is_empty() => d.trim().to_string(),
        _ => return Err(AppError::MissingFields),
    };

    let request = SupportRequest::new(
        auth.user_id.clone(),
        subject,
        description,
        req.category.unwrap_or_default(),
        req.priority.unwrap_or_default(),
    );

    state
        .support_store
        .create(&request)
        .map_err(AppError::Internal)?;
    tracing::info!(user_id = %auth.user_id, request_id = %request.id, "Support request filed");

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/support
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ListSupportResponse>> {
    let requests = state
        .support_store
        .list_for_user(&auth.user_id)
        .map_err(AppError::Internal)?;
    let count = requests.len();

    Ok(Json(ListSupportResponse { requests, count }))
}
