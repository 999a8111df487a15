//! Response payloads of the public API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ChainType, CouponType, PayTokenId, SearchStatus, SignData};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCheckResponse {
    pub coupon_type: CouponType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRegisterResponse {
    pub order_id: String,
    pub token_id: PayTokenId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_address: Option<String>,
    pub amount: Decimal,
    pub pay_type: String,
}

/// Handle to an unsigned transaction awaiting off-box signing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInfo {
    pub sign_key: String,
    pub sign_list: Vec<SignData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSendResponse {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetailResponse {
    pub account: String,
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_chain_type: Option<ChainType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_chain_type: Option<ChainType>,
    /// Unix seconds, like the other timestamps here
    pub registered_at: i64,
    pub expired_at: i64,
    /// Set while the account awaits recycling
    pub re_register_time: i64,
    pub base_amount: Decimal,
    pub account_price: Decimal,
}
