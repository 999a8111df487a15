//! On-chain account snapshot, as mirrored by the indexer

use serde::{Deserialize, Serialize};

/// Owner value of an account whose owner lock was burned
pub const NULL_OWNER: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Normal,
    OnSale,
    OnAuction,
    OnCross,
}

impl AccountStatus {
    pub fn from_db(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::OnSale),
            2 => Some(Self::OnAuction),
            3 => Some(Self::OnCross),
            _ => None,
        }
    }

    pub fn as_db(&self) -> i16 {
        match self {
            Self::Normal => 0,
            Self::OnSale => 1,
            Self::OnAuction => 2,
            Self::OnCross => 3,
        }
    }
}

/// Read-only account row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AccountInfo {
    pub account_id: String,
    pub account: String,
    pub owner: String,
    pub owner_chain_type: i16,
    pub owner_algorithm_id: i16,
    pub manager: String,
    pub manager_chain_type: i16,
    pub manager_algorithm_id: i16,
    pub status: i16,
    /// Unix seconds
    pub registered_at: i64,
    /// Unix seconds
    pub expired_at: i64,
}

impl AccountInfo {
    pub fn account_status(&self) -> Option<AccountStatus> {
        AccountStatus::from_db(self.status)
    }

    pub fn is_on_cross(&self) -> bool {
        self.account_status() == Some(AccountStatus::OnCross)
    }

    pub fn has_null_owner(&self) -> bool {
        self.owner.eq_ignore_ascii_case(NULL_OWNER)
    }

    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expired_at <= now_secs
    }
}

/// Availability of a name as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Registerable,
    Registering,
    Registered,
    OnSale,
    OnAuction,
    OnCross,
    OnDutchAuction,
    AuctionRecycling,
    Reserved,
    Unavailable,
    NotOpen,
}

impl SearchStatus {
    pub fn from_account_status(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Normal => Self::Registered,
            AccountStatus::OnSale => Self::OnSale,
            AccountStatus::OnAuction => Self::OnAuction,
            AccountStatus::OnCross => Self::OnCross,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(owner: &str, status: i16) -> AccountInfo {
        AccountInfo {
            account_id: "0x01".into(),
            account: "alice.bit".into(),
            owner: owner.into(),
            owner_chain_type: 1,
            owner_algorithm_id: 5,
            manager: owner.into(),
            manager_chain_type: 1,
            manager_algorithm_id: 5,
            status,
            registered_at: 0,
            expired_at: 1_000,
        }
    }

    #[test]
    fn null_owner_is_case_insensitive() {
        assert!(account(NULL_OWNER, 0).has_null_owner());
        assert!(!account("0xabc", 0).has_null_owner());
    }

    #[test]
    fn cross_and_expiry() {
        assert!(account("0xabc", 3).is_on_cross());
        assert!(!account("0xabc", 0).is_on_cross());
        assert!(account("0xabc", 0).is_expired(1_000));
        assert!(!account("0xabc", 0).is_expired(999));
    }
}
