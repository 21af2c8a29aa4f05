//! Per-key inbound/outbound request rate limiting.

mod limiter;

pub use limiter::{Decision, KeyedRateLimiter};
