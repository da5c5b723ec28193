use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{agents, api, calls, chat, sessions};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        // Voice calls
        .route("/calls", get(calls::list_calls).post(calls::start_call))
        .route("/calls/{session_key}", delete(calls::stop_call))
        // Text turns
        .route("/chat", post(chat::chat))
        // Sessions
        .route("/sessions/{session_key}", get(sessions::get_session))
        .route(
            "/sessions/{session_key}/end",
            post(sessions::end_session_handler),
        )
        // Agent configuration
        .route("/agents/{agent_id}", put(agents::upsert_agent))
        .route(
            "/agents/{agent_id}/invalidate",
            post(agents::invalidate_agent),
        )
        .layer(TraceLayer::new_for_http())
}
