//! Request bodies of the public API

use serde::{Deserialize, Serialize};

use crate::models::{ChainType, PayTokenId, SignData};

/// Treat an empty optional string as absent
fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCheckRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRegisterRequest {
    pub chain_type: ChainType,
    pub address: String,
    pub account: String,
    pub register_years: i32,
    pub pay_token_id: PayTokenId,
    #[serde(default)]
    pub pay_type: String,
    #[serde(default)]
    pub inviter_account: Option<String>,
    #[serde(default)]
    pub channel_account: Option<String>,
    #[serde(default)]
    pub gift_card: Option<String>,
    #[serde(default)]
    pub coin_type: Option<String>,
    #[serde(default)]
    pub cross_coin_type: Option<String>,
}

impl OrderRegisterRequest {
    pub fn inviter(&self) -> Option<&str> {
        non_empty(&self.inviter_account)
    }

    pub fn channel(&self) -> Option<&str> {
        non_empty(&self.channel_account)
    }

    pub fn gift_card(&self) -> Option<&str> {
        non_empty(&self.gift_card)
    }

    pub fn coin_type(&self) -> Option<&str> {
        non_empty(&self.coin_type)
    }

    pub fn cross_coin_type(&self) -> Option<&str> {
        non_empty(&self.cross_coin_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePayRequest {
    pub order_id: String,
    pub chain_type: ChainType,
    pub address: String,
    #[serde(default)]
    pub evm_chain_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSendRequest {
    pub sign_key: String,
    #[serde(default)]
    pub sign_list: Vec<SignData>,
    /// Passkey that produced webauthn signatures
    #[serde(default)]
    pub sign_address: Option<String>,
}

impl TransactionSendRequest {
    pub fn sign_address(&self) -> Option<&str> {
        non_empty(&self.sign_address)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetailRequest {
    pub account: String,
}
