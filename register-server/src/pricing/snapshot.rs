//! Price configuration snapshot
//!
//! Immutable once built. [`PriceConfigHandle::reload`] swaps the whole
//! `Arc`, so a computation holding an older snapshot never sees a partial
//! update.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PricingError;
use crate::chain::ONE_CKB;

/// Yearly unit prices in micro-USD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthPrice {
    pub new: u64,
    pub renew: u64,
}

fn default_basic_capacity() -> u64 {
    206 * ONE_CKB
}

fn default_prepared_fee() -> u64 {
    ONE_CKB
}

fn default_max_years() -> u32 {
    20
}

fn default_grace_period() -> i64 {
    90 * 86_400
}

fn default_auction_period() -> i64 {
    27 * 86_400
}

fn default_delivery_period() -> i64 {
    3 * 86_400
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Keyed by minimum account length; a length uses the largest key not above it
    pub prices: BTreeMap<u8, LengthPrice>,
    /// Inviter discount in 1/10000
    #[serde(default)]
    pub inviter_discount: u32,
    /// Minimum occupied capacity of an account cell, in shannons
    #[serde(default = "default_basic_capacity")]
    pub default_basic_capacity: u64,
    /// Per owner-algorithm override of `default_basic_capacity`
    #[serde(default)]
    pub basic_capacity_by_algorithm: HashMap<u8, u64>,
    /// Fee reserved in the account cell, in shannons
    #[serde(default = "default_prepared_fee")]
    pub prepared_fee: u64,
    /// Global premium, `0.1` = +10%
    #[serde(default)]
    pub premium: Decimal,
    /// Global discount multiplier, `0.9` = 10% off; zero means none, at most 1
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default = "default_max_years")]
    pub max_register_years: u32,
    /// Rejects order creation and balance payment while set
    #[serde(default)]
    pub maintenance: bool,
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: i64,
    #[serde(default = "default_auction_period")]
    pub auction_period_secs: i64,
    #[serde(default = "default_delivery_period")]
    pub delivery_period_secs: i64,
}

impl PriceSnapshot {
    pub fn unit_price(&self, account_char_len: usize) -> Option<LengthPrice> {
        let len = u8::try_from(account_char_len).unwrap_or(u8::MAX);
        self.prices.range(..=len).next_back().map(|(_, p)| *p)
    }

    pub fn basic_capacity(&self, algorithm_id: u8) -> u64 {
        self.basic_capacity_by_algorithm
            .get(&algorithm_id)
            .copied()
            .unwrap_or(self.default_basic_capacity)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.prices.is_empty() {
            return Err(PricingError::Config("price table is empty".into()));
        }
        if self.inviter_discount > 10_000 {
            return Err(PricingError::Config(format!(
                "inviter discount {} exceeds 10000",
                self.inviter_discount
            )));
        }
        if self.premium.is_sign_negative() || self.discount.is_sign_negative() {
            return Err(PricingError::Config("negative premium or discount".into()));
        }
        if self.discount > Decimal::ONE {
            return Err(PricingError::Config(format!(
                "discount multiplier {} exceeds 1",
                self.discount
            )));
        }
        if self.max_register_years == 0 {
            return Err(PricingError::Config("max_register_years must be positive".into()));
        }
        Ok(())
    }

    pub fn from_json(raw: &str) -> Result<Self, PricingError> {
        let snapshot: Self =
            serde_json::from_str(raw).map_err(|e| PricingError::Config(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Shared, atomically swappable price configuration
#[derive(Clone)]
pub struct PriceConfigHandle {
    current: Arc<RwLock<Arc<PriceSnapshot>>>,
}

impl PriceConfigHandle {
    pub fn new(snapshot: PriceSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PricingError> {
        Ok(Self::new(read_snapshot(path.as_ref()).await?))
    }

    /// Current snapshot; clone once per computation
    pub fn snapshot(&self) -> Arc<PriceSnapshot> {
        self.current.read().clone()
    }

    pub fn reload(&self, snapshot: PriceSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Re-read the snapshot file. A bad file keeps the previous snapshot.
    pub async fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), PricingError> {
        let snapshot = read_snapshot(path.as_ref()).await?;
        self.reload(snapshot);
        Ok(())
    }
}

async fn read_snapshot(path: &Path) -> Result<PriceSnapshot, PricingError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PricingError::Config(format!("{}: {e}", path.display())))?;
    PriceSnapshot::from_json(&raw)
}
