//! The dedupe store contract: atomic "have I seen this key; if not, remember
//! it for TTL" check-and-mark.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Atomic check-and-mark dedupe primitive.
///
/// `check_and_mark` returns `true` iff `key` was already marked within its
/// active TTL window; it returns `false` and marks the key in the same
/// atomic step otherwise. Implementations must be race-free: two concurrent
/// calls for the same unseen key must yield exactly one `false` and one
/// `true`. There is no unset/delete in this contract — `check_and_mark` is
/// the only mutating operation a dedupe store exposes.
#[async_trait]
pub trait DedupeStore: Send + Sync {
    async fn check_and_mark(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Verify the store is reachable, bounded by `timeout`. Called once at
    /// connector startup; a failure here is a boot-time fail-closed signal,
    /// not a per-request error.
    async fn ping(&self, timeout: Duration) -> Result<()>;
}
