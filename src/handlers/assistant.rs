//! Conversational assistant endpoints.
//!
//! `chat` hands the message to the dispatcher, which classifies it, runs the
//! chosen action, and records the exchange. The handler's only jobs are
//! bounds-checking the input and converting the outcome into an HTTP reply.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::assistant::{AssistantResponse, Dispatcher};
use crate::auth::AuthUser;
use crate::errors::{Result, ValidationErrorExt};
use crate::store::types::Turn;
use crate::validation;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub user_message: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<Turn>,
    pub count: usize,
}

/// POST /api/assistant/chat
pub async fn chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> Result<(StatusCode, Json<AssistantResponse>)> {
    // Empty input is the dispatcher's concern; only the size cap lives here.
    if !req.user_message.trim().is_empty() {
        validation::validate_message(&req.user_message).map_validation_err("userMessage")?;
    }

    let dispatcher = Dispatcher::new(
        Arc::clone(&state.classifier),
        Arc::clone(&state.task_store),
        Arc::clone(&state.user_store),
        Arc::clone(&state.conversation_store),
    );

    let outcome = dispatcher.dispatch(&auth.user_id, &req.user_message).await?;
    Ok((outcome.status, Json(outcome.body)))
}

/// GET /api/assistant/history
pub async fn history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>> {
    let turns = state
        .conversation_store
        .get_history(&auth.user_id)
        .map_err(crate::errors::AppError::Internal)?;
    let count = turns.len();

    Ok(Json(HistoryResponse { turns, count }))
}
