use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::resolve_session_key;
use crate::core::session::{Channel, get_or_create};
use crate::core::supervisor::CallInfo;
use crate::core::turn::{TurnOrchestrator, TurnPipeline};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::transport::LiveKitTransport;

#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    pub agent_id: String,
    pub room_name: String,
    /// Resume this session instead of starting a new one
    #[serde(default)]
    pub session_key: Option<String>,
}

/// Join a LiveKit room and start a supervised call worker.
///
/// Providers are built before joining so a misconfigured agent fails the
/// request instead of leaving a silent participant in the room.
pub async fn start_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartCallRequest>,
) -> AppResult<(StatusCode, Json<CallInfo>)> {
    if request.room_name.trim().is_empty() {
        return Err(AppError::BadRequest("room_name must not be empty".to_string()));
    }
    let settings = state.config.livekit_settings().ok_or_else(|| {
        AppError::ServiceUnavailable("LiveKit credentials are not configured".to_string())
    })?;

    let session_key = resolve_session_key(request.session_key)?;
    // held until the worker owns the session so no text turn lands in between
    let _guard = state.session_locks.lock(&session_key).await;
    if state.supervisor.is_running(&session_key) {
        return Err(AppError::Conflict(format!(
            "Call already running for session {session_key}"
        )));
    }

    let definition = state.runtime_cache.load(&request.agent_id).await?;
    let session = get_or_create(
        state.sessions.as_ref(),
        &session_key,
        &request.agent_id,
        Channel::Voice,
    )
    .await?;
    if !session.is_active() {
        return Err(AppError::Conflict(format!(
            "Session {session_key} is {} and cannot take a call",
            session.status
        )));
    }
    let pipeline = Arc::new(TurnPipeline::from_definition(
        definition,
        &state.credentials,
        Arc::clone(&state.retriever),
        state.config.stage_timeouts(),
        settings.sample_rate,
        true,
    )?);

    let (source, sink) =
        LiveKitTransport::connect(&settings, &request.room_name, &request.agent_id).await?;

    let store = Arc::clone(&state.sessions);
    let key = session_key.clone();
    let info = state
        .supervisor
        .spawn(&session_key, &request.agent_id, move |token| async move {
            let orchestrator =
                TurnOrchestrator::new(session, store, pipeline, Box::new(source), Arc::new(sink))
                    .with_shutdown(token);
            match orchestrator.run().await {
                Ok(session) => {
                    info!(
                        session_key = %key,
                        messages = session.message_count(),
                        "Call finished"
                    );
                }
                Err(e) => error!(session_key = %key, error = %e, "Call failed"),
            }
        })?;

    Ok((StatusCode::ACCEPTED, Json(info)))
}

/// Hang up a running call.
pub async fn stop_call(
    State(state): State<Arc<AppState>>,
    Path(session_key): Path<String>,
) -> AppResult<StatusCode> {
    if state.supervisor.stop(&session_key).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "No call running for session {session_key}"
        )))
    }
}

pub async fn list_calls(State(state): State<Arc<AppState>>) -> Json<Vec<CallInfo>> {
    Json(state.supervisor.active_calls())
}
