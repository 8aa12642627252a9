//! Session registry for the streamable HTTP transport.
//!
//! The registry is the only shared mutable structure in the server. Every
//! transport request looks its session up here; completed handshakes create
//! entries and only `DELETE` removes them. Dropping an event stream leaves
//! the session open.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metrics;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Active,
    Closed,
}

/// A snapshot of a transport session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

struct SessionEntry {
    session: Session,
    /// Serializes requests on one session.
    gate: Arc<Mutex<()>>,
    /// Flips to `true` once, when the session is closed.
    closed: watch::Sender<bool>,
}

/// Exclusive use of a session for the duration of one request.
pub struct SessionLease {
    pub session: Session,
    _guard: OwnedMutexGuard<()>,
}

/// Registry of live sessions keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, unique session in the `Initializing` state.
    pub fn create(&self) -> Session {
        let mut session = Session {
            id: String::new(),
            state: SessionState::Uninitialized,
            created_at: Utc::now(),
        };

        loop {
            let id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                session.id = id;
                session.state = SessionState::Initializing;
                let (closed, _) = watch::channel(false);
                slot.insert(SessionEntry {
                    session: session.clone(),
                    gate: Arc::new(Mutex::new(())),
                    closed,
                });
                break;
            }
        }

        debug!("Session {} initializing", session.id);
        metrics::set_active_sessions(self.sessions.len());
        session
    }

    /// Complete the handshake: `Initializing -> Active`.
    pub fn activate(&self, id: &str) -> Result<Session> {
        let mut entry = self.sessions.get_mut(id).ok_or(Error::InvalidSession)?;
        match entry.session.state {
            SessionState::Initializing => {
                entry.session.state = SessionState::Active;
                info!("MCP Session initialized: {}", id);
                Ok(entry.session.clone())
            }
            SessionState::Active => Err(Error::InvalidRequest(
                "Server already initialized".to_string(),
            )),
            SessionState::Uninitialized | SessionState::Closed => Err(Error::InvalidSession),
        }
    }

    /// Look up a session.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|e| e.session.clone())
    }

    /// Whether `id` names an `Active` session.
    pub fn is_active(&self, id: &str) -> bool {
        self.get(id)
            .is_some_and(|s| s.state == SessionState::Active)
    }

    /// Wait for exclusive use of an active session.
    ///
    /// Returns `None` if the session does not exist, is not active, or was
    /// closed while waiting.
    pub async fn acquire(&self, id: &str) -> Option<SessionLease> {
        let gate = {
            let entry = self.sessions.get(id)?;
            if entry.session.state != SessionState::Active {
                return None;
            }
            entry.gate.clone()
        };

        let guard = gate.lock_owned().await;
        let session = self.get(id)?;
        if session.state != SessionState::Active {
            return None;
        }

        Some(SessionLease {
            session,
            _guard: guard,
        })
    }

    /// A receiver that observes `true` once the session is closed.
    pub fn closed_signal(&self, id: &str) -> Option<watch::Receiver<bool>> {
        self.sessions.get(id).map(|e| e.closed.subscribe())
    }

    /// Remove a session. Closing an unknown or already closed session is a
    /// no-op and returns `None`.
    pub fn close(&self, id: &str) -> Option<Session> {
        let (_, entry) = self.sessions.remove(id)?;
        entry.closed.send_replace(true);

        let mut session = entry.session;
        session.state = SessionState::Closed;
        info!("MCP Session closed: {}", id);
        metrics::set_active_sessions(self.sessions.len());
        Some(session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
