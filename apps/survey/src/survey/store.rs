use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::survey::session::Session;

pub const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 1800;

struct StoredSession {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

/// In-memory survey sessions. Each session sits behind its own mutex so that
/// exactly one command mutates it at a time. Sessions untouched for longer
/// than the idle TTL are dropped by [`SessionStore::evict_idle`].
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            StoredSession {
                session: Arc::new(Mutex::new(session)),
                last_used: Instant::now(),
            },
        );
        id
    }

    /// Looks a session up and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(&id)?;
        stored.last_used = Instant::now();
        Some(stored.session.clone())
    }

    /// Returns false when the id was not stored.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drops every session idle for at least the TTL; returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| now.duration_since(stored.last_used) < self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {evicted} idle survey sessions");
        }
        evicted
    }
}
