//! Per-key request rate limiting.
//!
//! Grounded in `fc-router::pool::ProcessPool`'s use of `governor`: the same
//! `RateLimiter<NotKeyed, InMemoryState, DefaultClock>` direct limiter, one
//! instance per key instead of one shared instance per pool, held in a
//! `DashMap` the way the pool holds its per-group queues.

use dashmap::DashMap;
use governor::{clock::{Clock, DefaultClock}, state::{InMemoryState, NotKeyed}, Quota, RateLimiter as GovernorLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type KeyLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Result of a `consume` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Present only when `allowed` is false: how long the caller should
    /// wait before retrying.
    pub retry_after: Option<Duration>,
}

impl Decision {
    fn allow() -> Self {
        Self { allowed: true, retry_after: None }
    }

    fn deny(retry_after: Duration) -> Self {
        Self { allowed: false, retry_after: Some(retry_after) }
    }
}

/// A rate limiter keyed by an arbitrary string (connector id, recipient id,
/// sender phone number — whatever the caller's isolation unit is), each key
/// getting its own independent token bucket at the configured quota.
///
/// A quota of `None` disables rate limiting entirely: `consume` always
/// allows, matching the "rate limit removed (100→null)" case in
/// `wait_for_rate_limit_permit`, except here the caller polls instead of
/// this limiter blocking — an inbound webhook handler must return quickly,
/// it cannot sit in a `sleep` loop waiting for a permit.
pub struct KeyedRateLimiter {
    per_minute: Option<NonZeroU32>,
    buckets: DashMap<String, Arc<KeyLimiter>>,
}

impl KeyedRateLimiter {
    pub fn new(per_minute: Option<u32>) -> Self {
        Self {
            per_minute: per_minute.and_then(NonZeroU32::new),
            buckets: DashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    fn bucket_for(&self, quota_per_minute: NonZeroU32, key: &str) -> Arc<KeyLimiter> {
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(GovernorLimiter::direct(Quota::per_minute(quota_per_minute))))
            .clone()
    }

    /// Attempt to consume `cost` tokens from `key`'s bucket. `cost` of zero
    /// is treated as one: there is no such thing as a free request here.
    pub fn consume(&self, key: &str, cost: u32) -> Decision {
        let Some(quota_per_minute) = self.per_minute else {
            return Decision::allow();
        };

        let bucket = self.bucket_for(quota_per_minute, key);
        let cost = NonZeroU32::new(cost.max(1)).expect("cost clamped to at least 1");

        match bucket.check_n(cost) {
            Ok(Ok(())) => Decision::allow(),
            Ok(Err(not_until)) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Decision::deny(wait)
            }
            Err(_insufficient_capacity) => {
                // The bucket can never satisfy this cost even when full.
                Decision::deny(Duration::from_secs(60))
            }
        }
    }

    /// Number of distinct keys currently tracked. Exposed for diagnostics.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_limiter_always_allows() {
        let limiter = KeyedRateLimiter::disabled();
        for _ in 0..100 {
            assert!(limiter.consume("k", 1).allowed);
        }
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = KeyedRateLimiter::new(Some(1));
        assert!(limiter.consume("a", 1).allowed);
        // "a" is now exhausted, but "b" has never been touched.
        assert!(!limiter.consume("a", 1).allowed);
        assert!(limiter.consume("b", 1).allowed);
    }

    #[test]
    fn exhausted_bucket_reports_retry_after() {
        let limiter = KeyedRateLimiter::new(Some(1));
        assert!(limiter.consume("k", 1).allowed);
        let decision = limiter.consume("k", 1);
        assert!(!decision.allowed);
        assert!(decision.retry_after.is_some());
    }

    #[test]
    fn cost_larger_than_quota_is_denied_without_panicking() {
        let limiter = KeyedRateLimiter::new(Some(5));
        let decision = limiter.consume("k", 1000);
        assert!(!decision.allowed);
    }

    #[test]
    fn zero_cost_is_treated_as_one() {
        let limiter = KeyedRateLimiter::new(Some(1));
        assert!(limiter.consume("k", 0).allowed);
        assert!(!limiter.consume("k", 0).allowed);
    }
}
