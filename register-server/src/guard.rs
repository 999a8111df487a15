//! Idempotency and rate guard
//!
//! Short-lived keys in the shared KV store: a request lock per order
//! intent, a post-broadcast cooldown per (chain, address, action) and a
//! per-account lock. Expiry is the only release path for the first and
//! the last two.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use shared::error::AppError;
use shared::models::ChainType;

use crate::config::GuardConfig;
use crate::db::Store;
use crate::error::ServiceResult;
use crate::kv::{KvError, KvStore};

/// Held lock: the key plus the token only its holder knows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub key: String,
    pub token: String,
}

/// Exclusive lock with TTL on top of [`KvStore`]
#[derive(Clone)]
pub struct DistributedLock {
    kv: Arc<dyn KvStore>,
}

impl DistributedLock {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// `Ok(None)` when another holder owns the key
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LockHandle>, KvError> {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);

        if self.kv.set_nx(key, &token, ttl).await? {
            Ok(Some(LockHandle {
                key: key.to_string(),
                token,
            }))
        } else {
            Ok(None)
        }
    }

    /// Returns `false` when the lock had already expired or changed hands
    pub async fn release(&self, handle: &LockHandle) -> Result<bool, KvError> {
        self.kv.delete_if_eq(&handle.key, &handle.token).await
    }
}

fn request_lock_key(chain: ChainType, address: &str, action: &str, account: &str) -> String {
    format!("register_lock:{}:{}:{}:{}", chain.as_db(), address, action, account)
}

fn api_limit_key(chain: ChainType, address: &str, action: &str) -> String {
    format!("api_limit:{}:{}:{}", chain.as_db(), address, action)
}

fn account_limit_key(account: &str) -> String {
    format!("account_limit:{account}")
}

#[derive(Clone)]
pub struct RateGuard {
    kv: Arc<dyn KvStore>,
    lock: DistributedLock,
    store: Arc<dyn Store>,
    config: GuardConfig,
}

impl RateGuard {
    pub fn new(kv: Arc<dyn KvStore>, store: Arc<dyn Store>, config: GuardConfig) -> Self {
        Self {
            lock: DistributedLock::new(kv.clone()),
            kv,
            store,
            config,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// At most one in-flight request per (chain, address, action, account)
    /// inside the lock TTL. The lock is never released explicitly.
    pub async fn acquire_request_lock(
        &self,
        chain: ChainType,
        address: &str,
        action: &str,
        account: &str,
    ) -> ServiceResult<()> {
        let key = request_lock_key(chain, address, action, account);
        match self.lock.acquire(&key, self.config.request_lock_ttl).await? {
            Some(_) => Ok(()),
            None => {
                tracing::debug!(key = %key, "request lock held");
                Err(AppError::too_frequent().into())
            }
        }
    }

    pub async fn check_unpaid_orders(&self, chain: ChainType, address: &str) -> ServiceResult<()> {
        let unpaid = self.store.count_unpaid_orders(chain, address).await?;
        if unpaid > self.config.max_unpaid_orders {
            tracing::info!(chain = %chain, address = %address, unpaid, "unpaid order ceiling reached");
            return Err(AppError::too_frequent().into());
        }
        Ok(())
    }

    pub async fn check_api_limit(
        &self,
        chain: ChainType,
        address: &str,
        action: &str,
    ) -> ServiceResult<()> {
        if self.kv.exists(&api_limit_key(chain, address, action)).await? {
            return Err(AppError::too_frequent().into());
        }
        Ok(())
    }

    pub async fn set_api_limit(
        &self,
        chain: ChainType,
        address: &str,
        action: &str,
    ) -> Result<(), KvError> {
        self.kv
            .set(
                &api_limit_key(chain, address, action),
                "1",
                self.config.api_limit_ttl,
            )
            .await
    }

    pub async fn check_account_limit(&self, account: &str) -> ServiceResult<()> {
        if self.kv.exists(&account_limit_key(account)).await? {
            return Err(AppError::too_frequent().into());
        }
        Ok(())
    }

    pub async fn set_account_limit(&self, account: &str) -> Result<(), KvError> {
        self.kv
            .set(&account_limit_key(account), "1", self.config.account_limit_ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::kv::MemoryKv;
    use shared::error::ErrorCode;

    fn guard() -> RateGuard {
        RateGuard::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryStore::new()),
            GuardConfig::default(),
        )
    }

    #[tokio::test]
    async fn lock_release_requires_token() {
        let lock = DistributedLock::new(Arc::new(MemoryKv::new()));
        let held = lock
            .acquire("coupon_lock:abc", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert!(lock
            .acquire("coupon_lock:abc", Duration::from_secs(60))
            .await
            .unwrap()
            .is_none());

        let forged = LockHandle {
            key: held.key.clone(),
            token: "not-the-token".into(),
        };
        assert!(!lock.release(&forged).await.unwrap());
        assert!(lock.release(&held).await.unwrap());
        assert!(lock
            .acquire("coupon_lock:abc", Duration::from_secs(60))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn request_lock_is_ttl_bound() {
        let guard = guard();
        guard
            .acquire_request_lock(ChainType::Eth, "0xabc", "register", "alice.bit")
            .await
            .unwrap();

        let err = guard
            .acquire_request_lock(ChainType::Eth, "0xabc", "register", "alice.bit")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationTooFrequent);

        // different account is independent
        guard
            .acquire_request_lock(ChainType::Eth, "0xabc", "register", "bob.bit")
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        guard
            .acquire_request_lock(ChainType::Eth, "0xabc", "register", "alice.bit")
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn api_and_account_limits() {
        let guard = guard();
        guard.check_api_limit(ChainType::Eth, "0xabc", "transfer").await.unwrap();
        guard.set_api_limit(ChainType::Eth, "0xabc", "transfer").await.unwrap();
        assert!(guard.check_api_limit(ChainType::Eth, "0xabc", "transfer").await.is_err());

        guard.set_account_limit("alice.bit").await.unwrap();
        assert!(guard.check_account_limit("alice.bit").await.is_err());
        guard.check_account_limit("bob.bit").await.unwrap();

        tokio::time::advance(Duration::from_secs(121)).await;
        guard.check_api_limit(ChainType::Eth, "0xabc", "transfer").await.unwrap();
        guard.check_account_limit("alice.bit").await.unwrap();
    }

    #[tokio::test]
    async fn unpaid_ceiling_is_exclusive() {
        let guard = RateGuard::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryStore::new()),
            GuardConfig {
                max_unpaid_orders: 0,
                ..GuardConfig::default()
            },
        );
        // zero unpaid orders is not above a ceiling of zero
        guard.check_unpaid_orders(ChainType::Eth, "0xabc").await.unwrap();
    }
}
