use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::core::session::{Channel, get_or_create};
use crate::core::turn::TurnPipeline;
use super::resolve_session_key;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub agent_id: String,
    /// Existing session to continue; a new one is created when absent
    #[serde(default)]
    pub session_key: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_key: String,
    pub reply: String,
    pub message_count: u64,
}

/// Answer one text message on the `text` channel.
///
/// Turns on the same session run one at a time. A session with a live call
/// belongs to its call worker and is rejected with 409.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let definition = state.runtime_cache.load(&request.agent_id).await?;
    let session_key = resolve_session_key(request.session_key)?;
    let _guard = state.session_locks.lock(&session_key).await;
    if state.supervisor.is_running(&session_key) {
        return Err(AppError::Conflict(format!(
            "Session {session_key} is owned by a running call"
        )));
    }
    let mut session = get_or_create(
        state.sessions.as_ref(),
        &session_key,
        &request.agent_id,
        Channel::Text,
    )
    .await?;

    let pipeline = TurnPipeline::from_definition(
        definition,
        &state.credentials,
        Arc::clone(&state.retriever),
        state.config.stage_timeouts(),
        state.config.sample_rate,
        false,
    )?;

    let reply = pipeline
        .respond(state.sessions.as_ref(), &mut session, message)
        .await?;
    debug!(session_key = %session_key, "Chat turn answered");

    Ok(Json(ChatResponse {
        session_key,
        reply,
        message_count: session.message_count(),
    }))
}
