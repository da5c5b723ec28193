//! Conversation sessions: ordered turn history, context and lifecycle.

pub mod lock;
pub mod store;
pub mod types;

pub use lock::{SessionGuard, SessionLocks};
pub use store::{InMemorySessionStore, SessionStore, end_session, get_or_create, spawn_sweeper};
pub use types::{Channel, Role, Session, SessionError, SessionResult, SessionStatus, Turn};
