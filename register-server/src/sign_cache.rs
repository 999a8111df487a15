//! Sign-cache bridge
//!
//! Carries an unsigned transaction from the build request to the send
//! request under a one-time key. Reads are destructive (`take`), so a key
//! can drive at most one broadcast.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use shared::models::{AuctionInfo, ChainType, TxAction};
use shared::util::now_millis;

use crate::chain::{NormalizedAddress, OutPoint, UnsignedTx};
use crate::error::ServiceResult;
use crate::kv::{KvError, KvStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInfoCache {
    pub action: TxAction,
    pub account: String,
    pub chain_type: ChainType,
    pub address: String,
    /// Normalized form of `address`; owner side of passkey key-index lookups
    pub owner: NormalizedAddress,
    /// Shannons moved by the business output
    pub capacity: u64,
    pub tx: UnsignedTx,
    /// Cells held for this build
    pub reserved_cells: Vec<OutPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_info: Option<AuctionInfo>,
    /// Unix ms; set by [`SignCache::put`]
    #[serde(default)]
    pub expires_at: i64,
}

fn cache_key(sign_key: &str) -> String {
    format!("sign_tx:{sign_key}")
}

#[derive(Clone)]
pub struct SignCache {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SignCache {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store an entry under a fresh sign key
    pub async fn put(&self, mut entry: SignInfoCache) -> ServiceResult<String> {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        let sign_key = hex::encode(raw);

        entry.expires_at = now_millis() + self.ttl.as_millis() as i64;
        let json = serde_json::to_string(&entry)?;
        self.kv.set(&cache_key(&sign_key), &json, self.ttl).await?;
        Ok(sign_key)
    }

    /// Consume an entry; absent or expired keys are `TxExpired`
    pub async fn take(&self, sign_key: &str) -> ServiceResult<SignInfoCache> {
        let json = self
            .kv
            .take(&cache_key(sign_key))
            .await?
            .ok_or_else(AppError::tx_expired)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Put a taken entry back for the rest of its lifetime
    pub async fn restore(&self, sign_key: &str, entry: &SignInfoCache) -> Result<bool, KvError> {
        let remaining = entry.expires_at - now_millis();
        if remaining <= 0 {
            return Ok(false);
        }
        let json = serde_json::to_string(entry).map_err(|e| KvError::Backend(e.to_string()))?;
        self.kv
            .set(
                &cache_key(sign_key),
                &json,
                Duration::from_millis(remaining as u64),
            )
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use shared::error::ErrorCode;

    fn entry() -> SignInfoCache {
        SignInfoCache {
            action: TxAction::Transfer,
            account: "alice.bit".into(),
            chain_type: ChainType::Eth,
            address: "0xabc".into(),
            owner: NormalizedAddress {
                chain_type: ChainType::Eth,
                address_hex: "0xabc".into(),
                algorithm_id: 5,
                sub_algorithm_id: 0,
            },
            capacity: 100,
            tx: UnsignedTx::default(),
            reserved_cells: vec![OutPoint::new("0x01", 0)],
            auction_info: None,
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let cache = SignCache::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        let key = cache.put(entry()).await.unwrap();

        let got = cache.take(&key).await.unwrap();
        assert_eq!(got.account, "alice.bit");
        assert!(got.expires_at > 0);

        let err = cache.take(&key).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TxExpired);
    }

    #[tokio::test]
    async fn unknown_key_is_expired() {
        let cache = SignCache::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        let err = cache.take("nope").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TxExpired);
    }

    #[tokio::test]
    async fn restore_makes_entry_takeable_again() {
        let cache = SignCache::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        let key = cache.put(entry()).await.unwrap();
        let taken = cache.take(&key).await.unwrap();

        assert!(cache.restore(&key, &taken).await.unwrap());
        assert_eq!(cache.take(&key).await.unwrap(), taken);
    }

    #[tokio::test]
    async fn lapsed_entry_is_not_restored() {
        let cache = SignCache::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        let mut stale = entry();
        stale.expires_at = now_millis() - 1;
        assert!(!cache.restore("k", &stale).await.unwrap());
        assert!(cache.take("k").await.is_err());
    }
}
