//! Register server configuration

use std::collections::HashMap;
use std::time::Duration;

use crate::chain::ONE_CKB;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Lock and cooldown windows of the request guard
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Per (chain, address, action, account) request lock
    pub request_lock_ttl: Duration,
    /// Exclusive lock on a gift-card code while an order is being created
    pub coupon_lock_ttl: Duration,
    /// Unpaid-order ceiling per (chain, address)
    pub max_unpaid_orders: i64,
    /// Cooldown on (chain, address, action) after a successful broadcast
    pub api_limit_ttl: Duration,
    /// Per-account lock after a successful broadcast
    pub account_limit_ttl: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            request_lock_ttl: Duration::from_secs(10),
            coupon_lock_ttl: Duration::from_secs(60),
            max_unpaid_orders: 200,
            api_limit_ttl: Duration::from_secs(5),
            account_limit_ttl: Duration::from_secs(120),
        }
    }
}

/// Funding constants, all in shannons
///
/// The two change floors are deliberately separate values.
#[derive(Debug, Clone)]
pub struct FundingConfig {
    pub tx_fee: u64,
    /// Minimum change left to the user (a change cell with a balance-type lock)
    pub user_change_floor: u64,
    /// Minimum change left in merchant cells
    pub merchant_change_floor: u64,
    /// Smallest valid plain cell
    pub min_cell_capacity: u64,
    pub change_split_base: u64,
    pub change_split_limit: usize,
    /// How long broadcast inputs stay hidden from selection
    pub consumed_cell_ttl: Duration,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            tx_fee: ONE_CKB,
            user_change_floor: 116 * ONE_CKB,
            merchant_change_floor: 61 * ONE_CKB,
            min_cell_capacity: 61 * ONE_CKB,
            change_split_base: 2000 * ONE_CKB,
            change_split_limit: 20,
            consumed_cell_ttl: Duration::from_secs(600),
        }
    }
}

/// Register server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; absent runs on the in-process store
    pub database_url: Option<String>,
    /// Redis URL; absent runs on the in-process KV backend (single node only)
    pub redis_url: Option<String>,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Salt mixed into gift-card digests
    pub coupon_salt: String,
    /// JSON price snapshot
    pub price_config_path: String,
    pub price_reload_interval: Duration,
    /// Beneficiary of balance payments
    pub balance_pay_address: String,
    /// Receipt address per pay-token chain (`eth`, `tron`, ...)
    pub pay_addresses: HashMap<String, String>,
    pub inviter_whitelist: Vec<String>,
    pub reserved_accounts: Vec<String>,
    pub unavailable_accounts: Vec<String>,
    pub ckb_rpc_url: String,
    pub indexer_url: String,
    pub sdk_rpc_url: String,
    pub sign_cache_ttl: Duration,
    pub guard: GuardConfig,
    pub funding: FundingConfig,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn env_opt(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.is_empty())
    }

    fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn env_secs(name: &str, default: Duration) -> Duration {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(default)
    }

    fn env_list(name: &str) -> Vec<String> {
        std::env::var(name)
            .map(|v| parse_list(&v))
            .unwrap_or_default()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url = Self::env_opt("DATABASE_URL");
        if database_url.is_none() && environment != "development" {
            return Err("DATABASE_URL must be set outside development".into());
        }

        let guard_defaults = GuardConfig::default();
        let funding_defaults = FundingConfig::default();

        Ok(Self {
            database_url,
            redis_url: Self::env_opt("REDIS_URL"),
            http_port: Self::env_parse("HTTP_PORT", 8080),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: Self::env_opt("LOG_DIR"),
            coupon_salt: Self::require_secret("COUPON_SALT", &environment)?,
            price_config_path: std::env::var("PRICE_CONFIG_PATH")
                .unwrap_or_else(|_| "config/price.json".into()),
            price_reload_interval: Self::env_secs("PRICE_RELOAD_SECS", Duration::from_secs(60)),
            balance_pay_address: Self::env_opt("BALANCE_PAY_ADDRESS")
                .ok_or("BALANCE_PAY_ADDRESS must be set")?,
            pay_addresses: std::env::var("PAY_ADDRESSES")
                .map(|v| parse_pay_addresses(&v))
                .unwrap_or_default(),
            inviter_whitelist: Self::env_list("INVITER_WHITELIST"),
            reserved_accounts: Self::env_list("RESERVED_ACCOUNTS"),
            unavailable_accounts: Self::env_list("UNAVAILABLE_ACCOUNTS"),
            ckb_rpc_url: std::env::var("CKB_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8114".into()),
            indexer_url: std::env::var("INDEXER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8116".into()),
            sdk_rpc_url: std::env::var("SDK_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8120".into()),
            sign_cache_ttl: Self::env_secs("SIGN_CACHE_TTL_SECS", Duration::from_secs(600)),
            guard: GuardConfig {
                request_lock_ttl: Self::env_secs(
                    "REQUEST_LOCK_TTL_SECS",
                    guard_defaults.request_lock_ttl,
                ),
                coupon_lock_ttl: Self::env_secs(
                    "COUPON_LOCK_TTL_SECS",
                    guard_defaults.coupon_lock_ttl,
                ),
                max_unpaid_orders: Self::env_parse(
                    "MAX_UNPAID_ORDERS",
                    guard_defaults.max_unpaid_orders,
                ),
                api_limit_ttl: Self::env_secs("API_LIMIT_TTL_SECS", guard_defaults.api_limit_ttl),
                account_limit_ttl: Self::env_secs(
                    "ACCOUNT_LIMIT_TTL_SECS",
                    guard_defaults.account_limit_ttl,
                ),
            },
            funding: FundingConfig {
                consumed_cell_ttl: Self::env_secs(
                    "CONSUMED_CELL_TTL_SECS",
                    funding_defaults.consumed_cell_ttl,
                ),
                ..funding_defaults
            },
            environment,
        })
    }
}

/// Comma-separated list, blanks dropped, lowercased
fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `eth=0xabc,tron=TXYZ` → {"eth": "0xabc", "tron": "TXYZ"}
fn parse_pay_addresses(v: &str) -> HashMap<String, String> {
    v.split(',')
        .filter_map(|pair| {
            let (chain, addr) = pair.split_once('=')?;
            let (chain, addr) = (chain.trim(), addr.trim());
            (!chain.is_empty() && !addr.is_empty()).then(|| (chain.to_lowercase(), addr.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_addresses_parse() {
        let map = parse_pay_addresses("eth=0xabc, TRON = TXyz ,bad,=x,doge=");
        assert_eq!(map.len(), 2);
        assert_eq!(map["eth"], "0xabc");
        assert_eq!(map["tron"], "TXyz");
    }

    #[test]
    fn list_parse_drops_blanks() {
        assert_eq!(parse_list(" Alice.bit,,bob.bit "), vec!["alice.bit", "bob.bit"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn funding_floors_are_independent() {
        let f = FundingConfig::default();
        assert_eq!(f.user_change_floor, 116 * ONE_CKB);
        assert_eq!(f.merchant_change_floor, 61 * ONE_CKB);
        assert_eq!(f.min_cell_capacity, 61 * ONE_CKB);
    }
}
