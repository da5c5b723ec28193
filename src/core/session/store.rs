//! Session persistence.
//!
//! The store is the only durable record of a conversation. Workers load a
//! session once at call start, own it for the duration of the call, and save
//! it after every mutation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{Channel, Session, SessionError, SessionResult};

/// Durable session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by key.
    async fn load(&self, session_key: &str) -> SessionResult<Option<Session>>;

    /// Insert or replace a session.
    ///
    /// A stored `ended`/`timeout` status is final: saving a copy with any
    /// other status fails with `SessionError::Closed`.
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// Transition every active session idle since before `cutoff` to
    /// `timeout`. Returns the keys that were expired.
    async fn sweep_inactive(&self, cutoff: OffsetDateTime) -> SessionResult<Vec<String>>;
}

/// Load a session or create and persist a fresh one.
///
/// An existing session bound to a different agent is rejected so a key
/// cannot silently switch agents mid-conversation.
pub async fn get_or_create(
    store: &dyn SessionStore,
    session_key: &str,
    agent_id: &str,
    channel: Channel,
) -> SessionResult<Session> {
    if let Some(session) = store.load(session_key).await? {
        if session.agent_id != agent_id {
            return Err(SessionError::AgentMismatch {
                session_key: session_key.to_string(),
                agent_id: session.agent_id,
            });
        }
        return Ok(session);
    }

    let session = Session::new(session_key, agent_id, channel);
    store.save(&session).await?;
    debug!(session_key, agent_id, %channel, "Created session");
    Ok(session)
}

/// Load a session and mark it ended. Missing keys are reported as `NotFound`.
pub async fn end_session(store: &dyn SessionStore, session_key: &str) -> SessionResult<Session> {
    let mut session = store
        .load(session_key)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_key.to_string()))?;
    if session.end() {
        store.save(&session).await?;
        info!(session_key, "Session ended");
    }
    Ok(session)
}

/// In-process session store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_key: &str) -> SessionResult<Option<Session>> {
        Ok(self.sessions.get(session_key).map(|entry| entry.clone()))
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        match self.sessions.entry(session.session_key.clone()) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get().status;
                if stored.is_terminal() && stored != session.status {
                    return Err(SessionError::Closed(session.session_key.clone()));
                }
                entry.insert(session.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(session.clone());
            }
        }
        Ok(())
    }

    async fn sweep_inactive(&self, cutoff: OffsetDateTime) -> SessionResult<Vec<String>> {
        let mut expired = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if session.is_active() && session.last_activity_at < cutoff && session.expire() {
                expired.push(session.session_key.clone());
            }
        }
        Ok(expired)
    }
}

/// Spawn the periodic idle sweeper.
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    idle_timeout: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let cutoff = OffsetDateTime::now_utc() - idle_timeout;
                    match store.sweep_inactive(cutoff).await {
                        Ok(expired) if !expired.is_empty() => {
                            info!(count = expired.len(), "Expired idle sessions");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "Session sweep failed"),
                    }
                }
            }
        }
    })
}
