//! Request-level checks that need no I/O

use shared::error::AppError;
use shared::util::ACCOUNT_SUFFIX;

/// Coin type required of cross-chain orders (ETH)
pub const CROSS_COIN_TYPE_ETH: &str = "60";

/// Lowercased top-level `.bit` account
pub fn normalize_account(raw: &str) -> Result<String, AppError> {
    let account = raw.trim().to_lowercase();
    if account.is_empty() {
        return Err(AppError::invalid_request("account is required").with_detail("field", "account"));
    }
    let Some(name) = account.strip_suffix(ACCOUNT_SUFFIX) else {
        return Err(AppError::invalid_request(format!("account must end with {ACCOUNT_SUFFIX}"))
            .with_detail("field", "account"));
    };
    if name.is_empty() || name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(AppError::invalid_request(format!("invalid account {account}"))
            .with_detail("field", "account"));
    }
    Ok(account)
}

/// Decimal digits without a leading zero, or exactly "0"
pub fn is_valid_coin_type(coin_type: &str) -> bool {
    match coin_type.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        digits => digits.iter().all(u8::is_ascii_digit),
    }
}

pub fn check_years(years: i32, max: u32) -> Result<u32, AppError> {
    match u32::try_from(years) {
        Ok(y) if (1..=max).contains(&y) => Ok(y),
        _ => Err(AppError::invalid_request(format!("register years [{years}] invalid"))
            .with_detail("field", "register_years")
            .with_detail("max", max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_normalization() {
        assert_eq!(normalize_account(" Alice.BIT ").unwrap(), "alice.bit");
        assert!(normalize_account("").is_err());
        assert!(normalize_account("alice").is_err());
        assert!(normalize_account(".bit").is_err());
        assert!(normalize_account("sub.alice.bit").is_err());
        assert!(normalize_account("al ice.bit").is_err());
    }

    #[test]
    fn coin_types() {
        for ok in ["0", "60", "195", "9006"] {
            assert!(is_valid_coin_type(ok), "{ok}");
        }
        for bad in ["", "00", "060", "-1", "6a", " 60"] {
            assert!(!is_valid_coin_type(bad), "{bad}");
        }
    }

    #[test]
    fn years_bounds() {
        assert_eq!(check_years(1, 20).unwrap(), 1);
        assert_eq!(check_years(20, 20).unwrap(), 20);
        assert!(check_years(0, 20).is_err());
        assert!(check_years(-3, 20).is_err());
        assert!(check_years(21, 20).is_err());
    }
}
