//! Single-process in-memory dedupe store.
//!
//! Suitable only for single-process testing — never used when horizontal
//! scale-out is possible (use `RedisDedupeStore` there). Grounded in
//! `QueueManager`'s `DashMap`-backed in-pipeline tracking: `DashMap`'s
//! sharded locking gives the atomicity `check_and_mark` requires without an
//! extra mutex at this layer.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::store::DedupeStore;

/// A mapping from dedupe key to expiry instant, with lazy expiry on read: a
/// `check_and_mark` that finds an expired entry treats it as absent and
/// re-marks it, via a single `DashMap::entry` call so the read-then-write is
/// atomic per key.
#[derive(Default)]
pub struct InMemoryDedupeStore {
    entries: DashMap<String, Instant>,
}

impl InMemoryDedupeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked, including ones that are logically
    /// expired but not yet swept. Exposed for tests and diagnostics only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DedupeStore for InMemoryDedupeStore {
    async fn check_and_mark(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut was_duplicate = false;

        self.entries
            .entry(key.to_string())
            .and_modify(|expiry| {
                if *expiry > now {
                    was_duplicate = true;
                } else {
                    // Expired: treat as a fresh key.
                    *expiry = now + ttl;
                }
            })
            .or_insert_with(|| now + ttl);

        Ok(was_duplicate)
    }

    async fn ping(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_check_is_not_a_duplicate() {
        let store = InMemoryDedupeStore::new();
        assert!(!store.check_and_mark("k1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn repeated_check_within_ttl_is_a_duplicate() {
        let store = InMemoryDedupeStore::new();
        assert!(!store.check_and_mark("k1", Duration::from_secs(60)).await.unwrap());
        assert!(store.check_and_mark("k1", Duration::from_secs(60)).await.unwrap());
        assert!(store.check_and_mark("k1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn entry_is_forgotten_after_ttl_expiry() {
        let store = InMemoryDedupeStore::new();
        assert!(!store.check_and_mark("k1", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!store.check_and_mark("k1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_checks_on_same_unseen_key_yield_exactly_one_false() {
        let store = std::sync::Arc::new(InMemoryDedupeStore::new());
        let ttl = Duration::from_secs(60);

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.check_and_mark("race", ttl).await.unwrap() })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.check_and_mark("race", ttl).await.unwrap() })
        };

        let (a, b) = tokio::join!(a, b);
        let results = [a.unwrap(), b.unwrap()];
        assert_eq!(results.iter().filter(|r| !**r).count(), 1);
        assert_eq!(results.iter().filter(|r| **r).count(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_never_collide() {
        let store = InMemoryDedupeStore::new();
        assert!(!store.check_and_mark("a", Duration::from_secs(60)).await.unwrap());
        assert!(!store.check_and_mark("b", Duration::from_secs(60)).await.unwrap());
    }
}
