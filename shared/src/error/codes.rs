//! Unified error codes for the registration service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Address errors
//! - 2xxx: Permission errors
//! - 3xxx: Account errors
//! - 4xxx: Order errors
//! - 5xxx: Payment and coupon errors
//! - 6xxx: Transaction errors
//! - 7xxx: Rate limiting
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Address ====================
    /// Address could not be decoded for the given chain
    AddressFormatError = 1001,
    /// Chain type is not accepted for this operation
    ChainTypeNotSupported = 1002,

    // ==================== 2xxx: Permission ====================
    /// Signer is not authorized for the account
    PermissionDenied = 2001,

    // ==================== 3xxx: Account ====================
    /// Account does not exist
    AccountNotFound = 3001,
    /// Account is already registered
    AccountAlreadyRegistered = 3002,
    /// Account has an in-flight registration
    AccountRegistering = 3003,
    /// Account name is reserved
    AccountReserved = 3004,
    /// Account name is unavailable
    AccountUnavailable = 3005,
    /// Registration is not open for this account
    RegistrationNotOpen = 3006,
    /// Inviter account does not exist
    InviterAccountNotExist = 3007,
    /// Account is locked by a cross-chain transfer
    AccountOnCrossChain = 3008,
    /// Inviter account owner is the null address
    InviterOwnerInvalid = 3009,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Computed order amount is inconsistent with the funding source
    OrderAmountInconsistent = 4003,

    // ==================== 5xxx: Payment ====================
    /// Pay type not valid for this operation
    PayTypeInvalid = 5001,
    /// Pay token has no active quote
    UnsupportedToken = 5002,
    /// Balance is insufficient
    InsufficientBalance = 5003,
    /// Balance cannot produce a valid change cell
    NotEnoughChange = 5004,
    /// Coupon is invalid or not found
    CouponInvalid = 5005,
    /// Coupon already bound to an order
    CouponAlreadyUsed = 5006,
    /// Coupon tier does not match the account length
    CouponTypeMismatch = 5007,

    // ==================== 6xxx: Transaction ====================
    /// Cached transaction expired or already consumed
    TxExpired = 6001,
    /// Ledger rejected an input as spent, unknown or duplicated
    RejectedOutPoint = 6002,
    /// Ledger is applying backpressure
    LedgerBusy = 6003,
    /// Transaction submission failed
    TxSendFailed = 6004,
    /// Transaction could not be assembled
    TxBuildFailed = 6005,
    /// Signatures could not be attached
    SignatureInvalid = 6006,

    // ==================== 7xxx: Rate limiting ====================
    /// Operation issued too frequently
    OperationTooFrequent = 7001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9004,
    /// System is being upgraded
    SystemUpgrade = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether a client may retry the same request after a delay
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::OperationTooFrequent
                | ErrorCode::LedgerBusy
                | ErrorCode::InternalError
                | ErrorCode::TxSendFailed
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Address
            ErrorCode::AddressFormatError => "Address format error",
            ErrorCode::ChainTypeNotSupported => "Chain type not supported",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Account
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::AccountAlreadyRegistered => "Account already registered",
            ErrorCode::AccountRegistering => "Account registering",
            ErrorCode::AccountReserved => "Reserved account",
            ErrorCode::AccountUnavailable => "Unavailable account",
            ErrorCode::RegistrationNotOpen => "Registration is not open",
            ErrorCode::InviterAccountNotExist => "Inviter account not exist",
            ErrorCode::AccountOnCrossChain => "Account on cross chain",
            ErrorCode::InviterOwnerInvalid => "Inviter account owner is invalid",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order already paid",
            ErrorCode::OrderAmountInconsistent => "Order amount is inconsistent",

            // Payment
            ErrorCode::PayTypeInvalid => "Pay type invalid",
            ErrorCode::UnsupportedToken => "Pay token not supported",
            ErrorCode::InsufficientBalance => "Insufficient balance",
            ErrorCode::NotEnoughChange => "Not enough change",
            ErrorCode::CouponInvalid => "Gift card not found",
            ErrorCode::CouponAlreadyUsed => "Gift card already used",
            ErrorCode::CouponTypeMismatch => "Gift card type mismatch",

            // Transaction
            ErrorCode::TxExpired => "Transaction expired",
            ErrorCode::RejectedOutPoint => "Transaction input rejected, rebuild required",
            ErrorCode::LedgerBusy => "Ledger busy, please retry later",
            ErrorCode::TxSendFailed => "Transaction send failed",
            ErrorCode::TxBuildFailed => "Transaction build failed",
            ErrorCode::SignatureInvalid => "Signature invalid",

            // Rate limiting
            ErrorCode::OperationTooFrequent => "The operation is too frequent",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemUpgrade => "System upgrade in progress",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            // Address
            1001 => Ok(ErrorCode::AddressFormatError),
            1002 => Ok(ErrorCode::ChainTypeNotSupported),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Account
            3001 => Ok(ErrorCode::AccountNotFound),
            3002 => Ok(ErrorCode::AccountAlreadyRegistered),
            3003 => Ok(ErrorCode::AccountRegistering),
            3004 => Ok(ErrorCode::AccountReserved),
            3005 => Ok(ErrorCode::AccountUnavailable),
            3006 => Ok(ErrorCode::RegistrationNotOpen),
            3007 => Ok(ErrorCode::InviterAccountNotExist),
            3008 => Ok(ErrorCode::AccountOnCrossChain),
            3009 => Ok(ErrorCode::InviterOwnerInvalid),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4003 => Ok(ErrorCode::OrderAmountInconsistent),

            // Payment
            5001 => Ok(ErrorCode::PayTypeInvalid),
            5002 => Ok(ErrorCode::UnsupportedToken),
            5003 => Ok(ErrorCode::InsufficientBalance),
            5004 => Ok(ErrorCode::NotEnoughChange),
            5005 => Ok(ErrorCode::CouponInvalid),
            5006 => Ok(ErrorCode::CouponAlreadyUsed),
            5007 => Ok(ErrorCode::CouponTypeMismatch),

            // Transaction
            6001 => Ok(ErrorCode::TxExpired),
            6002 => Ok(ErrorCode::RejectedOutPoint),
            6003 => Ok(ErrorCode::LedgerBusy),
            6004 => Ok(ErrorCode::TxSendFailed),
            6005 => Ok(ErrorCode::TxBuildFailed),
            6006 => Ok(ErrorCode::SignatureInvalid),

            // Rate limiting
            7001 => Ok(ErrorCode::OperationTooFrequent),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9004 => Ok(ErrorCode::ConfigError),
            9005 => Ok(ErrorCode::SystemUpgrade),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
