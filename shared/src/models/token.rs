//! Pay token identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a token's pay amount is rounded after conversion from USD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRounding {
    /// The native ledger asset; the CKB total is reused verbatim
    Native,
    /// Volatile assets; snapped up to a multiple of 1e6 base units
    Micro,
    /// Plain ceiling in the token's base units
    Exact,
}

/// Pay token id such as `eth_eth` or `ckb_das`
///
/// Kept as an open string: an id with no active quote is a pricing error
/// (`UnsupportedToken`), not a malformed request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayTokenId(pub String);

impl PayTokenId {
    /// Paid from the user's on-chain balance through BuildPayment
    pub const CKB_DAS: &'static str = "ckb_das";
    pub const CKB_CKB: &'static str = "ckb_ckb";
    pub const CKB_INTERNAL: &'static str = "ckb_internal";
    pub const ETH: &'static str = "eth_eth";
    pub const BNB: &'static str = "bsc_bnb";
    pub const MATIC: &'static str = "polygon_matic";
    pub const TRX: &'static str = "tron_trx";
    pub const DOGE: &'static str = "doge_doge";
    pub const STRIPE_USD: &'static str = "stripe_usd";
    pub const COUPON: &'static str = "coupon";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_internal(&self) -> bool {
        self.0 == Self::CKB_INTERNAL
    }

    pub fn is_coupon(&self) -> bool {
        self.0 == Self::COUPON
    }

    pub fn is_balance(&self) -> bool {
        self.0 == Self::CKB_DAS
    }

    /// Chain prefix used to look up receipt addresses (`eth_eth` → `eth`)
    pub fn chain_string(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    pub fn rounding(&self) -> TokenRounding {
        match self.0.as_str() {
            Self::CKB_CKB | Self::CKB_DAS => TokenRounding::Native,
            Self::ETH | Self::BNB | Self::MATIC => TokenRounding::Micro,
            _ => TokenRounding::Exact,
        }
    }
}

impl fmt::Display for PayTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PayTokenId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
