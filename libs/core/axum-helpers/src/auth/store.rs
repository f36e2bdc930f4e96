use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Whitelist/blacklist of token ids (`jti`).
///
/// Issued tokens are whitelisted until they expire or are revoked. Revoked
/// tokens are also blacklisted for their remaining lifetime.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> eyre::Result<()>;
    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool>;
    async fn revoke(&self, jti: &str) -> eyre::Result<()>;
    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()>;
    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool>;
}

fn whitelist_key(jti: &str) -> String {
    format!("jwt:whitelist:{}", jti)
}

fn blacklist_key(jti: &str) -> String {
    format!("jwt:blacklist:{}", jti)
}

/// Redis-backed store, keys `jwt:whitelist:{jti}` and `jwt:blacklist:{jti}`
#[derive(Clone)]
pub struct RedisTokenStore {
    client: ConnectionManager,
}

impl RedisTokenStore {
    pub fn new(manager: ConnectionManager) -> Self {
        tracing::info!("Redis token store initialized");
        Self { client: manager }
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> eyre::Result<()> {
        let mut client = self.client.clone();
        client
            .set_ex::<_, _, ()>(whitelist_key(jti), user_id, ttl_seconds)
            .await?;
        Ok(())
    }

    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool> {
        let mut client = self.client.clone();
        Ok(client.exists(whitelist_key(jti)).await?)
    }

    async fn revoke(&self, jti: &str) -> eyre::Result<()> {
        let mut client = self.client.clone();
        client.del::<_, ()>(whitelist_key(jti)).await?;
        Ok(())
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()> {
        let mut client = self.client.clone();
        // SETEX rejects a zero TTL
        client
            .set_ex::<_, _, ()>(blacklist_key(jti), "1", ttl_seconds.max(1))
            .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool> {
        let mut client = self.client.clone();
        Ok(client.exists(blacklist_key(jti)).await?)
    }
}

/// Process-local store with expiry, for tests and single-node development
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn put(&self, key: String, ttl_seconds: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries.write().await.insert(key, expires_at);
    }

    async fn live(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn whitelist(&self, jti: &str, _user_id: &str, ttl_seconds: u64) -> eyre::Result<()> {
        self.put(whitelist_key(jti), ttl_seconds).await;
        Ok(())
    }

    async fn is_whitelisted(&self, jti: &str) -> eyre::Result<bool> {
        Ok(self.live(&whitelist_key(jti)).await)
    }

    async fn revoke(&self, jti: &str) -> eyre::Result<()> {
        self.entries.write().await.remove(&whitelist_key(jti));
        Ok(())
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> eyre::Result<()> {
        self.put(blacklist_key(jti), ttl_seconds.max(1)).await;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> eyre::Result<bool> {
        Ok(self.live(&blacklist_key(jti)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_whitelist_and_revoke() {
        let store = InMemoryTokenStore::new();
        store.whitelist("abc", "user-1", 60).await.unwrap();
        assert!(store.is_whitelisted("abc").await.unwrap());

        store.revoke("abc").await.unwrap();
        assert!(!store.is_whitelisted("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_entries_expire() {
        let store = InMemoryTokenStore::new();
        store.whitelist("gone", "user-1", 0).await.unwrap();
        assert!(!store.is_whitelisted("gone").await.unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_blacklist() {
        let store = InMemoryTokenStore::new();
        assert!(!store.is_blacklisted("abc").await.unwrap());
        store.blacklist("abc", 0).await.unwrap();
        assert!(store.is_blacklisted("abc").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_redis_store_roundtrip() {
        let redis = test_utils::TestRedis::new().await;
        let store = RedisTokenStore::new(redis.connection_manager().await);

        store.whitelist("jti-1", "user-1", 60).await.unwrap();
        assert!(store.is_whitelisted("jti-1").await.unwrap());
        store.revoke("jti-1").await.unwrap();
        store.blacklist("jti-1", 60).await.unwrap();
        assert!(!store.is_whitelisted("jti-1").await.unwrap());
        assert!(store.is_blacklisted("jti-1").await.unwrap());
    }
}
