use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use crate::core::agent::AgentConfig;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Create or replace an agent configuration.
///
/// The cached pipeline is evicted before responding, so the next call or
/// chat turn for this agent compiles the new configuration.
pub async fn upsert_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(config): Json<AgentConfig>,
) -> AppResult<Json<AgentConfig>> {
    if agent_id.trim().is_empty() {
        return Err(AppError::BadRequest("agent_id must not be empty".to_string()));
    }
    config
        .segmenter
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let stored = state.agents.upsert(&agent_id, config);
    state.runtime_cache.invalidate(&agent_id);
    info!(agent_id = %agent_id, version = stored.version, "Agent configuration updated");
    Ok(Json(stored))
}

/// Evict the compiled pipeline for an agent.
pub async fn invalidate_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> StatusCode {
    state.runtime_cache.invalidate(&agent_id);
    StatusCode::NO_CONTENT
}
