//! Shared key-value store
//!
//! Locks, cooldowns and the sign cache all live here. `RedisKv` is the
//! multi-node backend; `MemoryKv` serves tests and single-node development.

mod memory;
mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv connection error: {0}")]
    Connection(String),
    #[error("kv backend error: {0}")]
    Backend(String),
}

/// Minimal TTL key-value contract
///
/// Every write carries a TTL; expired keys behave as absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Set only if absent. Returns `true` when this call wrote the key.
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Atomic get + delete
    async fn take(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Delete only while the stored value equals `value`
    async fn delete_if_eq(&self, key: &str, value: &str) -> Result<bool, KvError>;

    async fn exists(&self, key: &str) -> Result<bool, KvError>;
}
