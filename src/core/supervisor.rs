//! Supervision of per-call workers.
//!
//! Every call runs as its own task with a cancellation token derived from
//! the supervisor's root token. Stopping a call cancels the token and waits
//! for the worker to finish its teardown, so no worker outlives its call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long `stop` waits for a worker's teardown before aborting it
const STOP_GRACE: Duration = Duration::from_secs(20);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SupervisorError {
    #[error("A call is already running for session {0}")]
    AlreadyRunning(String),
    #[error("Supervisor is shutting down")]
    ShuttingDown,
}

/// Public view of a running call
#[derive(Debug, Clone, Serialize)]
pub struct CallInfo {
    pub session_key: String,
    pub agent_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

struct ActiveCall {
    id: u64,
    info: CallInfo,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Registry of live call workers keyed by session key.
pub struct CallSupervisor {
    calls: Arc<DashMap<String, ActiveCall>>,
    root: CancellationToken,
    next_id: AtomicU64,
}

impl Default for CallSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSupervisor {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(DashMap::new()),
            root: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a worker for `session_key`. `call` receives the worker's
    /// cancellation token; at most one worker exists per session.
    pub fn spawn<F, Fut>(
        &self,
        session_key: &str,
        agent_id: &str,
        call: F,
    ) -> Result<CallInfo, SupervisorError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.root.is_cancelled() {
            return Err(SupervisorError::ShuttingDown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        let info = CallInfo {
            session_key: session_key.to_string(),
            agent_id: agent_id.to_string(),
            started_at: OffsetDateTime::now_utc(),
        };

        match self.calls.entry(session_key.to_string()) {
            Entry::Occupied(_) => {
                return Err(SupervisorError::AlreadyRunning(session_key.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(ActiveCall {
                    id,
                    info: info.clone(),
                    token: token.clone(),
                    handle: None,
                });
            }
        }

        let calls = Arc::clone(&self.calls);
        let key = session_key.to_string();
        let worker = call(token);
        let handle = tokio::spawn(async move {
            worker.await;
            calls.remove_if(&key, |_, active| active.id == id);
            debug!(session_key = %key, "Call worker exited");
        });

        // the worker may already have finished and deregistered itself
        if let Some(mut active) = self.calls.get_mut(session_key) {
            if active.id == id {
                active.handle = Some(handle);
            }
        }

        info!(session_key, agent_id, "Call worker started");
        Ok(info)
    }

    /// Cancel the worker for `session_key` and wait for it to finish.
    /// Returns `false` when no such call is running.
    pub async fn stop(&self, session_key: &str) -> bool {
        let Some((_, active)) = self.calls.remove(session_key) else {
            return false;
        };
        active.token.cancel();
        if let Some(handle) = active.handle {
            join_with_grace(session_key, handle).await;
        }
        info!(session_key, "Call worker stopped");
        true
    }

    /// Cancel every worker and wait for all of them.
    pub async fn shutdown_all(&self) {
        self.root.cancel();
        let keys: Vec<String> = self.calls.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some((_, active)) = self.calls.remove(&key) {
                if let Some(handle) = active.handle {
                    join_with_grace(&key, handle).await;
                }
            }
        }
        info!("All call workers stopped");
    }

    pub fn is_running(&self, session_key: &str) -> bool {
        self.calls.contains_key(session_key)
    }

    pub fn active_calls(&self) -> Vec<CallInfo> {
        self.calls.iter().map(|entry| entry.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

async fn join_with_grace(session_key: &str, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(STOP_GRACE, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(session_key, error = %e, "Call worker panicked"),
        Err(_) => {
            warn!(session_key, "Call worker did not stop in time, aborting");
            handle.abort();
        }
    }
}
