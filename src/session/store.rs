// ABOUTME: Session registry abstraction and its in-memory implementation
// Shared by every connection handler, so every operation is safe under concurrent access

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::SessionRecord;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session_id: Uuid, record: SessionRecord);

    async fn get(&self, session_id: &Uuid) -> Option<SessionRecord>;

    /// Returns whether a record was actually removed.
    async fn delete(&self, session_id: &Uuid) -> bool;

    /// Drop every record older than `max_age`; returns how many went.
    async fn sweep(&self, max_age: Duration) -> usize;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session_id: Uuid, record: SessionRecord) {
        self.sessions.insert(session_id, record);
    }

    async fn get(&self, session_id: &Uuid) -> Option<SessionRecord> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    async fn delete(&self, session_id: &Uuid) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    async fn sweep(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| !record.is_older_than(max_age, now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "Swept expired terminal sessions");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.sessions.len()
    }
}
