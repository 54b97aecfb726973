use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::Session;

/// Keyed store of refresh sessions.
///
/// Operations on the same key are linearizable; different keys never contend
/// on a shared lock. An expired entry reads as absent even before eviction.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert by refresh token; an existing entry is fully replaced.
    async fn put(&self, session: Session) -> Result<(), anyhow::Error>;
    async fn get(&self, refresh_token: &str) -> Result<Option<Session>, anyhow::Error>;
    /// Returns whether an entry was removed. Deleting an absent key is not an error.
    async fn delete(&self, refresh_token: &str) -> Result<bool, anyhow::Error>;
    async fn exists(&self, refresh_token: &str) -> Result<bool, anyhow::Error> {
        Ok(self.get(refresh_token).await?.is_some())
    }
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// Process-local store backed by a sharded map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before.saturating_sub(self.sessions.len())
    }

    /// Periodically purge expired entries until the store is dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<(), anyhow::Error> {
        self.sessions.insert(session.refresh_token.clone(), session);
        Ok(())
    }

    async fn get(&self, refresh_token: &str) -> Result<Option<Session>, anyhow::Error> {
        // One shard read; eviction is left to `purge_expired`.
        let now = Utc::now();
        Ok(self
            .sessions
            .get(refresh_token)
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.value().clone()))
    }

    async fn delete(&self, refresh_token: &str) -> Result<bool, anyhow::Error> {
        Ok(self.sessions.remove(refresh_token).is_some())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
