use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use redis::{aio::ConnectionManager, Client};
use sha2::{Digest, Sha256};

use super::session_store::SessionStore;
use crate::models::{Session, SessionRecord};

const KEY_PREFIX: &str = "refresh_session:";

/// Redis key for a refresh token. Only a digest of the token is stored.
pub fn session_key(refresh_token: &str) -> String {
    let digest = Sha256::digest(refresh_token.as_bytes());
    format!("{}{}", KEY_PREFIX, URL_SAFE_NO_PAD.encode(digest))
}

/// Session store shared across instances. Every operation is a single Redis
/// command, and Redis expires entries through `EX`.
#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %url, "Connecting to Redis");
        let client = Client::open(url)?;

        // Use ConnectionManager for automatic reconnection
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, session: Session) -> Result<(), anyhow::Error> {
        let ttl = session.remaining_seconds();
        if ttl == 0 {
            // Already expired; make sure no older entry lingers under the key.
            self.delete(&session.refresh_token).await?;
            return Ok(());
        }

        let mut conn = self.manager.clone();
        let value = serde_json::to_string(&session.record())?;

        redis::cmd("SET")
            .arg(session_key(&session.refresh_token))
            .arg(value)
            .arg("EX")
            .arg(ttl)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store session: {}", e))
    }

    async fn get(&self, refresh_token: &str) -> Result<Option<Session>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(refresh_token))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read session: {}", e))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let record: SessionRecord = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Corrupt session record: {}", e))?;
        let session = Session::from_record(refresh_token.to_string(), record);

        Ok((!session.is_expired()).then_some(session))
    }

    async fn delete(&self, refresh_token: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(session_key(refresh_token))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete session: {}", e))?;

        Ok(removed > 0)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, Utc};

    async fn store() -> RedisSessionStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisSessionStore::new(&url).await.unwrap()
    }

    fn session(ttl: Duration) -> Session {
        let now = Utc::now();
        Session::new(
            format!("test-{}", uuid::Uuid::new_v4()),
            "a@x.com".to_string(),
            Role::User,
            now,
            now + ttl,
        )
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_put_get_delete() {
        let store = store().await;
        let session = session(Duration::days(1));
        let token = session.refresh_token.clone();

        store.put(session.clone()).await.unwrap();
        assert_eq!(store.get(&token).await.unwrap(), Some(session));
        assert!(store.exists(&token).await.unwrap());

        let mut conn = store.manager.clone();
        let ttl: i64 = redis::cmd("TTL")
            .arg(session_key(&token))
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(ttl > 0 && ttl <= 86_400);

        assert!(store.delete(&token).await.unwrap());
        assert!(!store.delete(&token).await.unwrap());
        assert!(store.get(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_put_of_expired_session_clears_key() {
        let store = store().await;
        let live = session(Duration::days(1));
        let token = live.refresh_token.clone();
        store.put(live.clone()).await.unwrap();

        let expired = Session {
            expires_at: Utc::now() - Duration::seconds(1),
            ..live
        };
        store.put(expired).await.unwrap();

        assert!(store.get(&token).await.unwrap().is_none());
        assert!(!store.delete(&token).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_stale_record_reads_as_absent() {
        let store = store().await;
        let stale = session(Duration::seconds(-30));
        let token = stale.refresh_token.clone();

        // Written past its expiry with a live Redis TTL, as after clock skew.
        let mut conn = store.manager.clone();
        let _: () = redis::cmd("SET")
            .arg(session_key(&token))
            .arg(serde_json::to_string(&stale.record()).unwrap())
            .arg("EX")
            .arg(60)
            .query_async(&mut conn)
            .await
            .unwrap();

        assert!(store.get(&token).await.unwrap().is_none());
        assert!(!store.exists(&token).await.unwrap());
        assert!(store.delete(&token).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_health_check() {
        assert!(store().await.health_check().await.is_ok());
    }

    #[test]
    fn test_session_key_hides_token() {
        let key = session_key("eyJhbGciOiJIUzUxMiJ9.payload.sig");
        assert!(key.starts_with(KEY_PREFIX));
        assert!(!key.contains("payload"));
        // 32-byte digest, unpadded base64
        assert_eq!(key.len(), KEY_PREFIX.len() + 43);
    }

    #[test]
    fn test_session_key_is_stable() {
        assert_eq!(session_key("abc"), session_key("abc"));
        assert_ne!(session_key("abc"), session_key("abd"));
    }
}
