//! Redis-backed distributed dedupe store.
//!
//! Grounded in `fc-standby::leader::LeaderElection::try_acquire_leadership`:
//! the same `SET key value NX PX ttl` primitive, over the same
//! `redis::aio::ConnectionManager` (which reconnects transparently and is
//! cheap to clone), just used to answer "have I seen this key" instead of
//! "am I the leader".

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

use crate::error::{DedupeError, Result};
use crate::store::DedupeStore;

/// Distributed dedupe store backed by Redis (or Redis-compatible) `SET NX
/// PX`. Key prefix is configurable per connector (e.g. `whatsapp:dedupe:`),
/// matching spec's "Key prefix is configurable per connector" requirement.
pub struct RedisDedupeStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisDedupeStore {
    /// Connect to `redis_url`. A `rediss://` scheme enables TLS transparently
    /// via the `redis` crate's URL parsing — no extra configuration needed
    /// here.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| DedupeError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl DedupeStore for RedisDedupeStore {
    async fn check_and_mark(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let namespaced_key = self.namespaced(key);
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let result: Option<String> = redis::cmd("SET")
            .arg(&namespaced_key)
            .arg("1")
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;

        let was_duplicate = result.is_none();
        debug!(key = %namespaced_key, duplicate = was_duplicate, "dedupe check_and_mark");
        Ok(was_duplicate)
    }

    async fn ping(&self, timeout: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let ping = async { redis::cmd("PING").query_async::<_, String>(&mut conn).await };

        match tokio::time::timeout(timeout, ping).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DedupeError::Redis(e)),
            Err(_) => Err(DedupeError::PingTimeout(timeout)),
        }
    }
}
