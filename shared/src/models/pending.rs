//! Append-only records written after a successful broadcast

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Links a broadcast transaction to its account and action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PendingTransactionRecord {
    pub account: String,
    pub action: String,
    pub chain_type: i16,
    pub address: String,
    pub capacity: i64,
    /// `{tx_hash}-{index}`
    pub outpoint: String,
    /// Broadcast time (ms)
    pub block_timestamp: i64,
}

/// Bid placed on an expired account's dutch auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AuctionOrder {
    pub account: String,
    pub account_id: String,
    pub address: String,
    pub basic_price: Decimal,
    pub premium_price: Decimal,
    /// Unix seconds
    pub bid_time: i64,
    pub algorithm_id: i16,
    pub sub_algorithm_id: i16,
    pub chain_type: i16,
    pub outpoint: String,
}

/// Auction metadata carried from build to send for bid actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionInfo {
    pub basic_price: Decimal,
    pub premium_price: Decimal,
    pub bid_time: i64,
}
