//! Registration order model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chain::{ChainType, TxAction};
use super::token::PayTokenId;

/// Who created the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Placed by the account's future owner
    Own,
}

impl OrderType {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "own" => Some(Self::Own),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Own => "own",
        }
    }
}

/// Progress of an on-chain step (payment, hedge, pre-register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Default,
    Sending,
    Ok,
    Rejected,
}

impl TxStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "sending" => Some(Self::Sending),
            "ok" => Some(Self::Ok),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Sending => "sending",
            Self::Ok => "ok",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Default,
    Closed,
}

impl OrderStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Closed => "closed",
        }
    }
}

/// Coarse registration workflow progress, advanced by downstream workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    Default,
    ConfirmPayment,
    ApplyRegister,
    PreRegister,
    Propose,
    ConfirmProposal,
    Registered,
}

impl RegisterStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "confirm_payment" => Some(Self::ConfirmPayment),
            "apply_register" => Some(Self::ApplyRegister),
            "pre_register" => Some(Self::PreRegister),
            "propose" => Some(Self::Propose),
            "confirm_proposal" => Some(Self::ConfirmProposal),
            "registered" => Some(Self::Registered),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ConfirmPayment => "confirm_payment",
            Self::ApplyRegister => "apply_register",
            Self::PreRegister => "pre_register",
            Self::Propose => "propose",
            Self::ConfirmProposal => "confirm_proposal",
            Self::Registered => "registered",
        }
    }
}

/// Priced content persisted with the order as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderContent {
    pub account_char_str: String,
    #[serde(default)]
    pub inviter_account: String,
    #[serde(default)]
    pub channel_account: String,
    pub register_years: u32,
    pub amount_total_usd: Decimal,
    pub amount_total_ckb: Decimal,
}

/// A registration intent and its payment state machine
///
/// `pay_amount` is fixed at creation; re-pricing means a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub order_type: OrderType,
    pub account_id: String,
    pub account: String,
    pub action: TxAction,
    pub chain_type: ChainType,
    pub address: String,
    /// Creation time (ms)
    pub timestamp: i64,
    pub pay_token_id: PayTokenId,
    pub pay_type: String,
    pub pay_amount: Decimal,
    /// Serialized [`OrderContent`]
    pub content: String,
    pub pay_status: TxStatus,
    pub hedge_status: TxStatus,
    pub pre_register_status: TxStatus,
    pub order_status: OrderStatus,
    pub register_status: RegisterStatus,
    pub coin_type: String,
    pub cross_coin_type: String,
}

impl Order {
    pub fn parsed_content(&self) -> Result<OrderContent, serde_json::Error> {
        serde_json::from_str(&self.content)
    }

    /// Counts toward the per-address unpaid-order ceiling
    pub fn is_unpaid(&self) -> bool {
        self.pay_status == TxStatus::Default && self.order_status == OrderStatus::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_db_roundtrip() {
        for s in [TxStatus::Default, TxStatus::Sending, TxStatus::Ok, TxStatus::Rejected] {
            assert_eq!(TxStatus::from_db(s.as_db()), Some(s));
        }
        for s in [
            RegisterStatus::Default,
            RegisterStatus::ConfirmPayment,
            RegisterStatus::Registered,
        ] {
            assert_eq!(RegisterStatus::from_db(s.as_db()), Some(s));
        }
        assert_eq!(OrderStatus::from_db("closed"), Some(OrderStatus::Closed));
        assert_eq!(TxStatus::from_db("bogus"), None);
    }

    #[test]
    fn register_status_is_ordered() {
        assert!(RegisterStatus::ConfirmPayment < RegisterStatus::PreRegister);
        assert!(RegisterStatus::Registered > RegisterStatus::Propose);
    }

    #[test]
    fn content_tolerates_missing_referrers() {
        let json = r#"{"account_char_str":"abcd","register_years":1,
            "amount_total_usd":"0","amount_total_ckb":"0"}"#;
        let content: OrderContent = serde_json::from_str(json).unwrap();
        assert!(content.inviter_account.is_empty());
        assert!(content.channel_account.is_empty());
    }
}
