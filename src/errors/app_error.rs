//! HTTP-facing error type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::agent::AgentError;
use crate::core::session::SessionError;
use crate::core::supervisor::SupervisorError;
use crate::core::turn::TurnError;
use crate::transport::TransportError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    /// An upstream provider or the media server failed
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AgentError::InvalidConfiguration { .. } => AppError::BadRequest(err.to_string()),
            AgentError::Source(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => AppError::NotFound(err.to_string()),
            SessionError::Closed(_) | SessionError::AgentMismatch { .. } => {
                AppError::Conflict(err.to_string())
            }
            SessionError::Storage(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<SupervisorError> for AppError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::AlreadyRunning(_) => AppError::Conflict(err.to_string()),
            SupervisorError::ShuttingDown => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

impl From<TurnError> for AppError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Session(e) => e.into(),
            TurnError::EmptyTranscript | TurnError::LowConfidence { .. } => {
                AppError::BadRequest(err.to_string())
            }
            TurnError::Transcription(_)
            | TurnError::Reasoning(_)
            | TurnError::Synthesis(_)
            | TurnError::Transport(_) => AppError::BadGateway(err.to_string()),
            TurnError::Internal(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::LLMError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(AgentError::NotFound("a".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(SessionError::Closed("s".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(TurnError::Reasoning(LLMError::EmptyResponse)).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(TurnError::Session(SessionError::NotFound("s".into()))).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
