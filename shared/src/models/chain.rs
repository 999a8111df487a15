//! Chain types and address-level identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain a request address belongs to (numeric on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum ChainType {
    Ckb = 0,
    Eth = 1,
    Tron = 3,
    Mixin = 4,
    Doge = 7,
    Webauthn = 8,
}

impl ChainType {
    pub fn from_db(v: i16) -> Option<Self> {
        match v {
            0 => Some(Self::Ckb),
            1 => Some(Self::Eth),
            3 => Some(Self::Tron),
            4 => Some(Self::Mixin),
            7 => Some(Self::Doge),
            8 => Some(Self::Webauthn),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_db(&self) -> i16 {
        *self as i16
    }

    /// Chains that may own a newly registered account
    pub fn is_registrable(&self) -> bool {
        matches!(self, Self::Eth | Self::Tron | Self::Doge | Self::Webauthn)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ckb => "ckb",
            Self::Eth => "eth",
            Self::Tron => "tron",
            Self::Mixin => "mixin",
            Self::Doge => "doge",
            Self::Webauthn => "webauthn",
        }
    }
}

impl From<ChainType> for i16 {
    fn from(c: ChainType) -> Self {
        c.as_db()
    }
}

impl TryFrom<i16> for ChainType {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        Self::from_db(v).ok_or_else(|| format!("invalid chain type: {v}"))
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signing algorithm id used by passkey (webauthn) signatures
pub const WEBAUTHN_ALGORITHM_ID: u8 = 8;

/// One message to sign, or one returned signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignData {
    /// Signing algorithm id
    pub sign_type: u8,
    /// Hex message (build phase) or hex signature (send phase)
    pub sign_msg: String,
}

impl SignData {
    pub fn is_webauthn(&self) -> bool {
        self.sign_type == WEBAUTHN_ALGORITHM_ID
    }
}

/// Business action carried in the action witness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxAction {
    ApplyRegister,
    RenewAccount,
    Transfer,
    EditRecords,
    #[serde(rename = "bid_expired_account_dutch_auction")]
    BidExpiredAccountAuction,
}

impl TxAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplyRegister => "apply_register",
            Self::RenewAccount => "renew_account",
            Self::Transfer => "transfer",
            Self::EditRecords => "edit_records",
            Self::BidExpiredAccountAuction => "bid_expired_account_dutch_auction",
        }
    }
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
