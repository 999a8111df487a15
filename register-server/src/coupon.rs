//! Coupon ledger
//!
//! Gift-card codes are never stored raw: lookups go through a salted
//! SHA-256 digest. Redemption is lock → validate → bind-with-order, and the
//! bind happens inside the store's order insert.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};
use shared::models::{Coupon, CouponType};
use shared::util::now_secs;

use crate::db::Store;
use crate::error::ServiceResult;
use crate::guard::{DistributedLock, LockHandle};

#[derive(Clone)]
pub struct CouponLedger {
    store: Arc<dyn Store>,
    lock: DistributedLock,
    salt: String,
}

impl CouponLedger {
    pub fn new(store: Arc<dyn Store>, lock: DistributedLock, salt: impl Into<String>) -> Self {
        Self {
            store,
            lock,
            salt: salt.into(),
        }
    }

    /// Salted digest used as the lookup key. `None` when no salt is configured.
    pub fn encode_code(&self, code: &str) -> Option<String> {
        if self.salt.is_empty() {
            tracing::error!("coupon salt is not configured");
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(code.trim().as_bytes());
        hasher.update(self.salt.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }

    /// Look up an unused coupon inside its validity window
    pub async fn redeem(&self, code: &str) -> ServiceResult<Coupon> {
        let digest = self
            .encode_code(code)
            .ok_or_else(|| AppError::new(ErrorCode::ConfigError))?;

        let coupon = self
            .store
            .coupon_by_digest(&digest)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CouponInvalid))?;

        if coupon.is_bound() {
            return Err(AppError::new(ErrorCode::CouponAlreadyUsed).into());
        }
        if !coupon.is_within_window(now_secs()) {
            return Err(AppError::with_message(ErrorCode::CouponInvalid, "gift card expired or not yet valid").into());
        }
        Ok(coupon)
    }

    /// Tier rule: four-char coupons need exactly four characters, five-plus coupons at least five
    pub fn check_eligibility(&self, coupon: &Coupon, account_char_len: usize) -> ServiceResult<CouponType> {
        match coupon.tier() {
            Some(tier) if tier.accepts_length(account_char_len) => Ok(tier),
            _ => Err(AppError::new(ErrorCode::CouponTypeMismatch)
                .with_detail("account_length", account_char_len)
                .into()),
        }
    }

    /// Exclusive redemption lock; contention is "too frequent", not a coupon error
    pub async fn lock(&self, code: &str, ttl: Duration) -> ServiceResult<LockHandle> {
        let digest = self
            .encode_code(code)
            .ok_or_else(|| AppError::new(ErrorCode::ConfigError))?;
        self.lock
            .acquire(&format!("coupon_lock:{digest}"), ttl)
            .await?
            .ok_or_else(|| AppError::too_frequent().into())
    }

    /// Release a redemption lock; failures are logged and the TTL takes over
    pub async fn unlock(&self, handle: &LockHandle) {
        match self.lock.release(handle).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(key = %handle.key, "coupon lock already expired"),
            Err(e) => tracing::warn!(key = %handle.key, error = %e, "coupon unlock failed"),
        }
    }
}
