//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_agent_gateway::ServerConfig;
use voice_agent_gateway::core::agent::{AgentConfig, InMemoryAgentConfigSource};
use voice_agent_gateway::core::knowledge::NoopRetriever;
use voice_agent_gateway::core::session::{InMemorySessionStore, SessionStore};
use voice_agent_gateway::routes::api::create_api_router;
use voice_agent_gateway::state::AppState;

fn app_with(config: ServerConfig) -> (Router, Arc<AppState>) {
    let agents = Arc::new(InMemoryAgentConfigSource::new());
    agents.upsert(
        "support",
        AgentConfig {
            system_prompt: "You answer questions about opening hours.".to_string(),
            ..Default::default()
        },
    );
    let state = AppState::with_parts(
        config,
        Arc::new(InMemorySessionStore::new()),
        agents,
        Arc::new(NoopRetriever),
    );
    (create_api_router().with_state(state.clone()), state)
}

async fn openai_backend(reply: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": reply}}]
        })))
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.openai_api_key = Some("sk-test".to_string());
    config.openai_base_url = Some(server.uri());
    config
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app_with(ServerConfig::default());
    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK", "active_calls": 0}));
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_records_turns() {
    let server = openai_backend("We open at nine.").await;
    let (app, _) = app_with(config_for(&server));

    let (status, body) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "web-1", "message": "When do you open?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_key"], "web-1");
    assert_eq!(body["reply"], "We open at nine.");
    assert_eq!(body["message_count"], 2);

    let (status, body) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "web-1", "message": "And close?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_count"], 4);

    let (status, session) = send(&app, "GET", "/sessions/web-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["channel"], "text");
    assert_eq!(session["status"], "active");
    assert_eq!(session["history"].as_array().unwrap().len(), 4);
    assert_eq!(session["history"][2]["content"], "And close?");
    assert_eq!(session["history"][1]["role"], "assistant");
    assert_eq!(session["history"][1]["spoken"], false);
}

#[tokio::test]
async fn test_chat_mints_session_key() {
    let server = openai_backend("Hello!").await;
    let (app, _) = app_with(config_for(&server));

    let (status, body) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let key = body["session_key"].as_str().unwrap();
    assert_eq!(key.len(), 36);

    let (status, _) = send(&app, "GET", &format!("/sessions/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_chat_rejects_bad_input() {
    let (app, _) = app_with(ServerConfig::default());

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "message": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "a/b", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "nobody", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn test_chat_provider_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (app, state) = app_with(config_for(&server));

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "s-err", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // the user turn survives the failed reply
    let session = state.sessions.load("s-err").await.unwrap().unwrap();
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_concurrent_chat_turns_are_all_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "ok"}}]
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    let (app, state) = app_with(config_for(&server));

    let turn = |message: &str| {
        json!({"agent_id": "support", "session_key": "k", "message": message})
    };
    let (status, _) = send(&app, "POST", "/chat", Some(turn("first"))).await;
    assert_eq!(status, StatusCode::OK);

    let (a, b) = tokio::join!(
        send(&app, "POST", "/chat", Some(turn("A"))),
        send(&app, "POST", "/chat", Some(turn("B"))),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    let mut counts = vec![a.1["message_count"].as_u64(), b.1["message_count"].as_u64()];
    counts.sort();
    assert_eq!(counts, vec![Some(4), Some(6)]);

    let stored = state.sessions.load("k").await.unwrap().unwrap();
    assert_eq!(stored.message_count(), 6);
    let users: Vec<_> = stored
        .history()
        .iter()
        .step_by(2)
        .map(|turn| turn.content.as_str())
        .collect();
    assert_eq!(users[0], "first");
    assert!(users.contains(&"A") && users.contains(&"B"));
    assert!(state.session_locks.is_empty());
}

#[tokio::test]
async fn test_chat_rejected_while_call_owns_session() {
    let server = openai_backend("Hi").await;
    let (app, state) = app_with(config_for(&server));
    state
        .supervisor
        .spawn("live-1", "support", |token| async move {
            token.cancelled().await;
        })
        .unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "live-1", "message": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("running call"));
    assert!(state.sessions.load("live-1").await.unwrap().is_none());

    state.supervisor.shutdown_all().await;
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_end_session_closes_it() {
    let server = openai_backend("Sure.").await;
    let (app, _) = app_with(config_for(&server));

    send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "s-1", "message": "Hi"})),
    )
    .await;

    let (status, body) = send(&app, "POST", "/sessions/s-1/end", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");
    assert!(body["ended_at"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "s-1", "message": "Still there?"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_session() {
    let (app, _) = app_with(ServerConfig::default());
    let (status, _) = send(&app, "GET", "/sessions/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/sessions/missing/end", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Agents
// =============================================================================

#[tokio::test]
async fn test_upsert_agent_bumps_version_and_invalidates() {
    let (app, state) = app_with(ServerConfig::default());
    state.runtime_cache.load("support").await.unwrap();
    assert!(state.runtime_cache.is_cached("support"));

    let (status, body) = send(
        &app,
        "PUT",
        "/agents/support",
        Some(json!({"system_prompt": "Be brief.", "voice_provider": "openai"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["system_prompt"], "Be brief.");
    assert!(!state.runtime_cache.is_cached("support"));

    let definition = state.runtime_cache.load("support").await.unwrap();
    assert_eq!(definition.system_prompt, "Be brief.");
}

#[tokio::test]
async fn test_upsert_agent_rejects_bad_segmenter() {
    let (app, _) = app_with(ServerConfig::default());
    let (status, _) = send(
        &app,
        "PUT",
        "/agents/new",
        Some(json!({"segmenter": {"silence_run_threshold": 0}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalidate_agent() {
    let (app, state) = app_with(ServerConfig::default());
    state.runtime_cache.load("support").await.unwrap();

    let (status, _) = send(&app, "POST", "/agents/support/invalidate", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!state.runtime_cache.is_cached("support"));
}

// =============================================================================
// Calls
// =============================================================================

#[tokio::test]
async fn test_start_call_requires_livekit() {
    let (app, _) = app_with(ServerConfig::default());
    let (status, body) = send(
        &app,
        "POST",
        "/calls",
        Some(json!({"agent_id": "support", "room_name": "room-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("LiveKit"));
}

#[tokio::test]
async fn test_start_call_rejects_closed_session() {
    let server = openai_backend("Bye.").await;
    let mut config = config_for(&server);
    config.livekit_api_key = Some("devkey".to_string());
    config.livekit_api_secret = Some("devsecret".to_string());
    let (app, state) = app_with(config);

    send(
        &app,
        "POST",
        "/chat",
        Some(json!({"agent_id": "support", "session_key": "done-1", "message": "Hi"})),
    )
    .await;
    let (status, _) = send(&app, "POST", "/sessions/done-1/end", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/calls",
        Some(json!({"agent_id": "support", "room_name": "room-1", "session_key": "done-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("ended"));
    assert!(state.supervisor.is_empty());
}

#[tokio::test]
async fn test_call_listing_and_stop() {
    let (app, state) = app_with(ServerConfig::default());

    let (status, body) = send(&app, "GET", "/calls", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    state
        .supervisor
        .spawn("s-voice", "support", |token| async move {
            token.cancelled().await;
        })
        .unwrap();

    let (_, body) = send(&app, "GET", "/calls", None).await;
    assert_eq!(body[0]["session_key"], "s-voice");
    assert_eq!(body[0]["agent_id"], "support");

    let (status, _) = send(&app, "DELETE", "/calls/s-voice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/calls/s-voice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
