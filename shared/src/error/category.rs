//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Address errors
/// - 2xxx: Permission errors
/// - 3xxx: Account errors
/// - 4xxx: Order errors
/// - 5xxx: Payment errors
/// - 6xxx: Transaction errors
/// - 7xxx: Rate limiting
/// - 8xxx and above: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Address errors (1xxx)
    Address,
    /// Permission errors (2xxx)
    Permission,
    /// Account errors (3xxx)
    Account,
    /// Order errors (4xxx)
    Order,
    /// Payment errors (5xxx)
    Payment,
    /// Transaction errors (6xxx)
    Transaction,
    /// Rate limiting (7xxx)
    RateLimit,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Address,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Account,
            4000..5000 => Self::Order,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Transaction,
            7000..8000 => Self::RateLimit,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Address);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Account);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Transaction);
        assert_eq!(ErrorCategory::from_code(7001), ErrorCategory::RateLimit);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::AddressFormatError.category(),
            ErrorCategory::Address
        );
        assert_eq!(
            ErrorCode::AccountRegistering.category(),
            ErrorCategory::Account
        );
        assert_eq!(
            ErrorCode::CouponAlreadyUsed.category(),
            ErrorCategory::Payment
        );
        assert_eq!(
            ErrorCode::RejectedOutPoint.category(),
            ErrorCategory::Transaction
        );
        assert_eq!(
            ErrorCode::OperationTooFrequent.category(),
            ErrorCategory::RateLimit
        );
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::RateLimit).unwrap();
        assert_eq!(json, "\"rate_limit\"");

        let category: ErrorCategory = serde_json::from_str("\"transaction\"").unwrap();
        assert_eq!(category, ErrorCategory::Transaction);
    }
}
