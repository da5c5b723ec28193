//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `agents` - Agent configuration upsert and runtime cache invalidation
//! - `calls` - Start and stop supervised voice calls
//! - `chat` - Text turns through the same pipeline
//! - `sessions` - Session inspection and closing

pub mod agents;
pub mod api;
pub mod calls;
pub mod chat;
pub mod sessions;

use crate::errors::app_error::{AppError, AppResult};

/// Use the caller's session key or mint a new one.
pub(crate) fn resolve_session_key(session_key: Option<String>) -> AppResult<String> {
    match session_key {
        Some(key) => {
            let key = key.trim();
            if key.is_empty() || key.contains('/') {
                return Err(AppError::BadRequest(format!("Invalid session key: {key:?}")));
            }
            Ok(key.to_string())
        }
        None => Ok(uuid::Uuid::new_v4().to_string()),
    }
}
