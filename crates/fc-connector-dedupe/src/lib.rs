//! Dedupe Store — atomic "have I seen this key before; if not, remember it
//! for TTL" primitive, with an in-memory implementation for single-process
//! testing and a Redis-backed implementation for horizontal scale-out.

mod error;
mod fail_mode;
mod in_memory;
mod redis_store;
mod store;

pub use error::{DedupeError, Result};
pub use fail_mode::DedupeFailMode;
pub use in_memory::InMemoryDedupeStore;
pub use redis_store::RedisDedupeStore;
pub use store::DedupeStore;

/// Default dedupe TTL: 5 minutes, per the runtime's lifecycle contract.
pub const DEFAULT_DEDUPE_TTL: std::time::Duration = std::time::Duration::from_secs(300);
