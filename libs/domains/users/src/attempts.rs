//! Failed login counters, keyed by lower-cased email
//!
//! Each failure bumps the counter and restarts its expiry window, so the
//! lockout lasts one full window after the last failed attempt.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::UserResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    /// Failures recorded within the current window
    async fn attempts(&self, email: &str) -> UserResult<u32>;

    /// Count one more failure and keep it for `window_secs`; returns the new count
    async fn record_failure(&self, email: &str, window_secs: u64) -> UserResult<u32>;

    async fn clear(&self, email: &str) -> UserResult<()>;
}

fn attempts_key(email: &str) -> String {
    format!("login_attempts:{}", email.trim().to_lowercase())
}

/// Redis-backed counters, key `login_attempts:{email}`
#[derive(Clone)]
pub struct RedisLoginAttemptStore {
    client: ConnectionManager,
}

impl RedisLoginAttemptStore {
    pub fn new(manager: ConnectionManager) -> Self {
        tracing::info!("Redis login attempt store initialized");
        Self { client: manager }
    }
}

#[async_trait]
impl LoginAttemptStore for RedisLoginAttemptStore {
    async fn attempts(&self, email: &str) -> UserResult<u32> {
        let mut client = self.client.clone();
        let count: Option<u32> = redis::cmd("GET")
            .arg(attempts_key(email))
            .query_async(&mut client)
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn record_failure(&self, email: &str, window_secs: u64) -> UserResult<u32> {
        let mut client = self.client.clone();
        let key = attempts_key(email);
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, window_secs.max(1) as i64)
            .ignore()
            .query_async(&mut client)
            .await?;
        Ok(count)
    }

    async fn clear(&self, email: &str) -> UserResult<()> {
        let mut client = self.client.clone();
        redis::cmd("DEL")
            .arg(attempts_key(email))
            .query_async::<()>(&mut client)
            .await?;
        Ok(())
    }
}

/// Process-local counters with expiry, for tests and single-node development
#[derive(Clone, Default)]
pub struct InMemoryLoginAttemptStore {
    entries: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
}

impl InMemoryLoginAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginAttemptStore for InMemoryLoginAttemptStore {
    async fn attempts(&self, email: &str) -> UserResult<u32> {
        Ok(self
            .entries
            .read()
            .await
            .get(&attempts_key(email))
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(count, _)| *count)
            .unwrap_or(0))
    }

    async fn record_failure(&self, email: &str, window_secs: u64) -> UserResult<u32> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(attempts_key(email)).or_insert((0, now));
        if entry.1 <= now {
            entry.0 = 0;
        }
        entry.0 += 1;
        entry.1 = now + Duration::from_secs(window_secs);
        Ok(entry.0)
    }

    async fn clear(&self, email: &str) -> UserResult<()> {
        self.entries.write().await.remove(&attempts_key(email));
        Ok(())
    }
}
