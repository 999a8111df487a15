//! Coupon / gift-card model

use serde::{Deserialize, Serialize};

/// Account-length tier a coupon is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// Accounts of exactly four characters
    FourChar,
    /// Accounts of five characters or more
    FivePlus,
}

impl CouponType {
    pub fn from_db(v: i16) -> Option<Self> {
        match v {
            1 => Some(Self::FourChar),
            2 => Some(Self::FivePlus),
            _ => None,
        }
    }

    pub fn as_db(&self) -> i16 {
        match self {
            Self::FourChar => 1,
            Self::FivePlus => 2,
        }
    }

    pub fn accepts_length(&self, account_len: usize) -> bool {
        match self {
            Self::FourChar => account_len == 4,
            Self::FivePlus => account_len >= 5,
        }
    }
}

/// Coupon row; `code` holds the salted digest, never the raw code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub coupon_type: i16,
    /// Empty while unused
    pub order_id: String,
    /// Validity window start (unix seconds)
    pub start_at: i64,
    /// Validity window end (unix seconds)
    pub expired_at: i64,
}

impl Coupon {
    pub fn tier(&self) -> Option<CouponType> {
        CouponType::from_db(self.coupon_type)
    }

    pub fn is_bound(&self) -> bool {
        !self.order_id.is_empty()
    }

    /// Both window boundaries are inclusive
    pub fn is_within_window(&self, now_secs: i64) -> bool {
        self.start_at <= now_secs && now_secs <= self.expired_at
    }
}
