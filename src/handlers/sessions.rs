use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::core::session::{Session, end_session};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Read a session with its full history.
///
/// Assistant turns carry `spoken`: `true` only when the reply finished
/// playing on a call. Replies cut off by barge-in, preempted by queued
/// speech or whose synthesis failed stay in history with `spoken: false`,
/// as do all text-channel replies. Consumers that want what the caller
/// actually heard filter on it.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> AppResult<Json<Session>> {
    state
        .sessions
        .load(&session_key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {session_key}")))
}

/// Close a session. A live call on it is stopped first so the worker's
/// final save cannot reopen it.
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> AppResult<Json<Session>> {
    state.supervisor.stop(&session_key).await;
    let session = end_session(state.sessions.as_ref(), &session_key).await?;
    Ok(Json(session))
}
