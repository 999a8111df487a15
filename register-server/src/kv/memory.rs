use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use super::{KvError, KvStore};

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Instant,
}

impl Slot {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-process KV backend
///
/// Atomic per key through dashmap's shard locks. Not shared between
/// processes, so only suitable for a single node.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, Slot>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries
    pub fn cleanup(&self) {
        self.entries.retain(|_, slot| slot.is_live());
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut e) => {
                if e.get().is_live() {
                    return Ok(false);
                }
                e.insert(Slot::new(value, ttl));
                Ok(true)
            }
            Entry::Vacant(e) => {
                e.insert(Slot::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), Slot::new(value, ttl));
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self
            .entries
            .remove(key)
            .map(|(_, slot)| slot)
            .filter(Slot::is_live)
            .map(|slot| slot.value))
    }

    async fn delete_if_eq(&self, key: &str, value: &str) -> Result<bool, KvError> {
        Ok(self
            .entries
            .remove_if(key, |_, slot| slot.is_live() && slot.value == value)
            .is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.entries.get(key).is_some_and(|slot| slot.is_live()))
    }
}
