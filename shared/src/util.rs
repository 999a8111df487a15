use sha2::{Digest, Sha256};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Account name suffix stripped before measuring length
pub const ACCOUNT_SUFFIX: &str = ".bit";

/// Character length of an account, excluding the `.bit` suffix
pub fn account_char_len(account: &str) -> usize {
    account
        .strip_suffix(ACCOUNT_SUFFIX)
        .unwrap_or(account)
        .chars()
        .count()
}

/// Stable 20-byte account id, hex encoded with `0x`
pub fn account_id(account: &str) -> String {
    let digest = Sha256::digest(account.to_lowercase().as_bytes());
    format!("0x{}", hex::encode(&digest[..20]))
}

/// Generate an order id from the order's identity plus randomness.
///
/// 32 hex chars; the caller still checks the store for collisions.
pub fn create_order_id(account: &str, chain_type: i16, address: &str, timestamp: i64) -> String {
    use rand::Rng;
    let nonce: u64 = rand::thread_rng().r#gen();
    let mut hasher = Sha256::new();
    hasher.update(account.as_bytes());
    hasher.update(chain_type.to_be_bytes());
    hasher.update(address.as_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(nonce.to_be_bytes());
    hex::encode(&hasher.finalize()[..16])
}
