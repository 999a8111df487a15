// register-server/tests/common/mod.rs
// In-process collaborators for the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};

use register_server::chain::{
    AddressCodec, CellIndexer, ChainClients, ChainError, KeyDirectory, LedgerRpc, LiveCell,
    NormalizedAddress, ONE_CKB, OutPoint, QuoteSource, Script, SearchOrder, SignedTx,
    SubmissionError, TokenQuote, TxCodec, UnsignedTx,
};
use register_server::config::{Config, FundingConfig, GuardConfig};
use register_server::coupon::CouponLedger;
use register_server::db::{MemoryStore, Store};
use register_server::guard::DistributedLock;
use register_server::kv::{KvStore, MemoryKv};
use register_server::pricing::{LengthPrice, PriceConfigHandle, PriceSnapshot};
use register_server::state::{AppState, Backends};
use shared::models::{
    AccountInfo, ChainType, Coupon, CouponType, PayTokenId, SignData, TxAction,
};
use shared::request::OrderRegisterRequest;
use shared::util::{account_id, now_secs};

pub const SALT: &str = "test-salt";
pub const BALANCE_PAY_ADDRESS: &str = "ckt1merchant";
pub const ETH_RECEIPT: &str = "0xreceipt";

/// Ledger, indexer and SDK in one fake
#[derive(Default)]
pub struct FakeChain {
    cells: Mutex<HashMap<String, Vec<LiveCell>>>,
    submit_results: Mutex<VecDeque<Result<String, SubmissionError>>>,
    submitted: Mutex<Vec<SignedTx>>,
    /// Every submission, accepted or not
    attempted: Mutex<Vec<SignedTx>>,
    /// Hashes `get_transaction` can see
    landed: Mutex<HashSet<String>>,
    key_indexes: Mutex<HashMap<(String, String), u8>>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clients(self: &Arc<Self>) -> ChainClients {
        ChainClients {
            codec: self.clone(),
            indexer: self.clone(),
            ledger: self.clone(),
            keys: self.clone(),
            quotes: self.clone(),
            tx_codec: self.clone(),
        }
    }

    /// Replace the live cells owned by `address`
    pub fn set_cells(&self, address: &str, capacities_ckb: &[u64]) {
        let args = address.to_lowercase();
        let cells = capacities_ckb
            .iter()
            .enumerate()
            .map(|(i, ckb)| LiveCell {
                out_point: OutPoint::new(format!("0xfund-{args}"), i as u32),
                capacity: ckb * ONE_CKB,
                lock: lock_for(&args),
                type_script: None,
            })
            .collect();
        self.cells.lock().insert(args, cells);
    }

    /// Next submit outcome; an empty queue accepts
    pub fn push_submit_result(&self, result: Result<String, SubmissionError>) {
        self.submit_results.lock().push_back(result);
    }

    pub fn submitted(&self) -> Vec<SignedTx> {
        self.submitted.lock().clone()
    }

    /// Make the last submission visible on the ledger, as if the node had
    /// accepted it and the reply was lost; returns its hash
    pub fn land_last_attempt(&self) -> String {
        let tx = self.attempted.lock().last().cloned().expect("nothing submitted");
        let hash = digest_hex(&serde_json::to_vec(&tx.tx).unwrap());
        self.landed.lock().insert(hash.clone());
        hash
    }

    pub fn authorize_key(&self, owner: &str, signer: &str, index: u8) {
        self.key_indexes
            .lock()
            .insert((owner.to_lowercase(), signer.to_lowercase()), index);
    }
}

fn lock_for(args: &str) -> Script {
    Script {
        code_hash: "0xlock".into(),
        hash_type: "type".into(),
        args: args.to_string(),
    }
}

fn algorithm_of(chain: ChainType) -> u8 {
    match chain {
        ChainType::Ckb => 0,
        ChainType::Eth => 5,
        ChainType::Tron => 4,
        ChainType::Mixin => 6,
        ChainType::Doge => 7,
        ChainType::Webauthn => 8,
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(Sha256::digest(bytes)))
}

#[async_trait]
impl AddressCodec for FakeChain {
    async fn normalize(
        &self,
        chain: ChainType,
        address: &str,
    ) -> Result<NormalizedAddress, ChainError> {
        if !address.starts_with("0x") {
            return Err(ChainError::AddressFormat(format!("bad address {address}")));
        }
        Ok(NormalizedAddress {
            chain_type: chain,
            address_hex: address.to_lowercase(),
            algorithm_id: algorithm_of(chain),
            sub_algorithm_id: 0,
        })
    }

    async fn lock_script(
        &self,
        address: &NormalizedAddress,
    ) -> Result<(Script, Option<Script>), ChainError> {
        Ok((lock_for(&address.address_hex), None))
    }

    async fn parse_address(&self, address: &str) -> Result<Script, ChainError> {
        Ok(lock_for(address))
    }

    async fn hex_to_normal(
        &self,
        _chain: ChainType,
        address_hex: &str,
        _algorithm_id: u8,
    ) -> Result<String, ChainError> {
        Ok(address_hex.to_string())
    }
}

#[async_trait]
impl CellIndexer for FakeChain {
    async fn live_cells(
        &self,
        lock: &Script,
        order: SearchOrder,
    ) -> Result<Vec<LiveCell>, ChainError> {
        let mut cells = self.cells.lock().get(&lock.args).cloned().unwrap_or_default();
        match order {
            SearchOrder::Desc => cells.sort_by(|a, b| b.capacity.cmp(&a.capacity)),
            SearchOrder::Asc => cells.sort_by(|a, b| a.capacity.cmp(&b.capacity)),
        }
        Ok(cells)
    }
}

#[async_trait]
impl LedgerRpc for FakeChain {
    async fn submit(&self, tx: &SignedTx) -> Result<String, SubmissionError> {
        self.attempted.lock().push(tx.clone());
        let queued = self.submit_results.lock().pop_front();
        match queued {
            Some(Err(e)) => Err(e),
            Some(Ok(hash)) => {
                self.submitted.lock().push(tx.clone());
                Ok(hash)
            }
            None => {
                self.submitted.lock().push(tx.clone());
                Ok(digest_hex(&serde_json::to_vec(&tx.tx).unwrap_or_default()))
            }
        }
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<serde_json::Value>, ChainError> {
        Ok(self
            .landed
            .lock()
            .contains(hash)
            .then(|| serde_json::json!({ "hash": hash })))
    }
}

#[async_trait]
impl KeyDirectory for FakeChain {
    async fn index_of(
        &self,
        owner: &NormalizedAddress,
        signer: &NormalizedAddress,
    ) -> Result<Option<u8>, ChainError> {
        Ok(self
            .key_indexes
            .lock()
            .get(&(owner.address_hex.clone(), signer.address_hex.clone()))
            .copied())
    }
}

#[async_trait]
impl QuoteSource for FakeChain {
    async fn ckb_quote(&self) -> Result<Decimal, ChainError> {
        Ok(dec!(0.01))
    }

    async fn token_quote(&self, token: &PayTokenId) -> Result<Option<TokenQuote>, ChainError> {
        let quote = match token.as_str() {
            PayTokenId::CKB_DAS | PayTokenId::CKB_CKB => TokenQuote {
                price: dec!(0.01),
                decimals: 8,
            },
            PayTokenId::ETH => TokenQuote {
                price: dec!(3000),
                decimals: 18,
            },
            _ => return Ok(None),
        };
        Ok(Some(quote))
    }
}

#[async_trait]
impl TxCodec for FakeChain {
    async fn action_witness(&self, action: TxAction) -> Result<String, ChainError> {
        Ok(format!("0x{}", hex::encode(action.as_str())))
    }

    async fn sign_list(
        &self,
        tx: &UnsignedTx,
        signer: &NormalizedAddress,
    ) -> Result<Vec<SignData>, ChainError> {
        let msg = serde_json::to_vec(tx).map_err(|e| ChainError::InvalidData(e.to_string()))?;
        Ok(vec![SignData {
            sign_type: signer.algorithm_id,
            sign_msg: digest_hex(&msg),
        }])
    }

    async fn inject_key_index(&self, sign: &SignData, index: u8) -> Result<SignData, ChainError> {
        Ok(SignData {
            sign_type: sign.sign_type,
            sign_msg: format!("{}{index:02x}", sign.sign_msg),
        })
    }

    async fn attach_signatures(
        &self,
        tx: &UnsignedTx,
        signs: &[SignData],
    ) -> Result<SignedTx, ChainError> {
        if signs.is_empty() {
            return Err(ChainError::Witness("no signatures".into()));
        }
        Ok(SignedTx {
            tx: tx.clone(),
            raw: serde_json::json!({ "signatures": signs }),
        })
    }

    async fn tx_hash(&self, tx: &SignedTx) -> Result<String, ChainError> {
        let body = serde_json::to_vec(&tx.tx).map_err(|e| ChainError::InvalidData(e.to_string()))?;
        Ok(digest_hex(&body))
    }
}

pub fn price_snapshot() -> PriceSnapshot {
    let mut prices = std::collections::BTreeMap::new();
    prices.insert(1, LengthPrice { new: 1_000_000_000, renew: 1_000_000_000 });
    prices.insert(4, LengthPrice { new: 160_000_000, renew: 160_000_000 });
    prices.insert(5, LengthPrice { new: 5_000_000, renew: 5_000_000 });
    PriceSnapshot {
        prices,
        inviter_discount: 1_000,
        default_basic_capacity: 206 * ONE_CKB,
        basic_capacity_by_algorithm: HashMap::new(),
        prepared_fee: ONE_CKB,
        premium: Decimal::ZERO,
        discount: Decimal::ZERO,
        max_register_years: 20,
        maintenance: false,
        grace_period_secs: 90 * 86_400,
        auction_period_secs: 27 * 86_400,
        delivery_period_secs: 3 * 86_400,
    }
}

pub fn test_config() -> Config {
    let mut pay_addresses = HashMap::new();
    pay_addresses.insert("eth".to_string(), ETH_RECEIPT.to_string());
    pay_addresses.insert("ckb".to_string(), BALANCE_PAY_ADDRESS.to_string());
    Config {
        database_url: None,
        redis_url: None,
        http_port: 0,
        environment: "development".into(),
        log_level: "debug".into(),
        log_dir: None,
        coupon_salt: SALT.into(),
        price_config_path: String::new(),
        price_reload_interval: Duration::from_secs(60),
        balance_pay_address: BALANCE_PAY_ADDRESS.into(),
        pay_addresses,
        inviter_whitelist: vec!["partner.bit".into()],
        reserved_accounts: vec!["google".into()],
        unavailable_accounts: vec!["admin.bit".into()],
        ckb_rpc_url: String::new(),
        indexer_url: String::new(),
        sdk_rpc_url: String::new(),
        sign_cache_ttl: Duration::from_secs(600),
        guard: GuardConfig::default(),
        funding: FundingConfig::default(),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub kv: Arc<MemoryKv>,
    pub chain: Arc<FakeChain>,
    pub prices: PriceConfigHandle,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let kv = Arc::new(MemoryKv::new());
        let chain = FakeChain::new();
        let prices = PriceConfigHandle::new(price_snapshot());
        let state = AppState::new(
            Backends {
                store: store.clone(),
                kv: kv.clone(),
                chain: chain.clients(),
                prices: prices.clone(),
                memory_kv: Some(kv.clone()),
            },
            &config,
        );
        Self {
            store,
            kv,
            chain,
            prices,
            state,
        }
    }

    /// Salted digest the store keys coupons by
    pub fn coupon_digest(&self, code: &str) -> String {
        let store: Arc<dyn Store> = self.store.clone();
        let kv: Arc<dyn KvStore> = self.kv.clone();
        CouponLedger::new(store, DistributedLock::new(kv), SALT)
            .encode_code(code)
            .unwrap()
    }

    pub fn add_coupon(&self, code: &str, tier: CouponType) {
        let now = now_secs();
        self.store.insert_coupon(Coupon {
            id: 1,
            code: self.coupon_digest(code),
            coupon_type: tier.as_db(),
            order_id: String::new(),
            start_at: now - 3_600,
            expired_at: now + 3_600,
        });
    }

    pub fn add_account(&self, account: &str, owner: &str, status: i16) {
        let now = now_secs();
        self.store.insert_account(AccountInfo {
            account_id: account_id(account),
            account: account.into(),
            owner: owner.into(),
            owner_chain_type: ChainType::Eth.as_db(),
            owner_algorithm_id: 5,
            manager: owner.into(),
            manager_chain_type: ChainType::Eth.as_db(),
            manager_algorithm_id: 5,
            status,
            registered_at: now - 86_400,
            expired_at: now + 365 * 86_400,
        });
    }
}

pub fn register_request(account: &str, address: &str, token: &str) -> OrderRegisterRequest {
    OrderRegisterRequest {
        chain_type: ChainType::Eth,
        address: address.into(),
        account: account.into(),
        register_years: 1,
        pay_token_id: PayTokenId::from(token),
        pay_type: String::new(),
        inviter_account: None,
        channel_account: None,
        gift_card: None,
        coin_type: None,
        cross_coin_type: None,
    }
}
