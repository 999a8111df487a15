//! Ledger-facing collaborators
//!
//! The core never encodes scripts, witnesses or addresses itself. It talks to
//! the ledger through the traits below; [`rpc::JsonRpcChain`] implements them
//! over JSON-RPC and tests provide in-process fakes.

pub mod rpc;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{ChainType, PayTokenId, SignData, TxAction};
use thiserror::Error;

/// Shannons per CKB
pub const ONE_CKB: u64 = 100_000_000;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("address format error: {0}")]
    AddressFormat(String),
    #[error("witness error: {0}")]
    Witness(String),
    #[error("invalid ledger data: {0}")]
    InvalidData(String),
    #[error("ledger transport error: {0}")]
    Transport(String),
}

/// Submission failure as reported by the ledger node
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    /// The node answered and refused the transaction
    #[error("node rejected transaction: {0}")]
    Node(String),
    /// The node could not be reached; the transaction may or may not have landed
    #[error("ledger transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    pub code_hash: String,
    pub hash_type: String,
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: String,
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tx_hash, self.index)
    }
}

/// A spendable value-carrying cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCell {
    pub out_point: OutPoint,
    pub capacity: u64,
    pub lock: Script,
    pub type_script: Option<Script>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutput {
    pub capacity: u64,
    pub lock: Script,
    pub type_script: Option<Script>,
}

/// Unsigned transaction body; output data and witnesses are hex strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<CellOutput>,
    pub outputs_data: Vec<String>,
    pub witnesses: Vec<String>,
}

impl UnsignedTx {
    pub fn output_capacity(&self) -> u64 {
        self.outputs.iter().map(|o| o.capacity).sum()
    }
}

/// Transaction with signature witnesses attached, ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTx {
    pub tx: UnsignedTx,
    /// Node wire format produced by the SDK
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Address in the ledger's canonical hex form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    pub chain_type: ChainType,
    pub address_hex: String,
    pub algorithm_id: u8,
    pub sub_algorithm_id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    Asc,
    Desc,
}

/// Token price in USD per whole token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenQuote {
    pub price: Decimal,
    pub decimals: u32,
}

/// Address/script codec
#[async_trait]
pub trait AddressCodec: Send + Sync {
    async fn normalize(&self, chain: ChainType, address: &str)
    -> Result<NormalizedAddress, ChainError>;

    /// Spend authority for a normalized address: lock plus optional type script
    async fn lock_script(
        &self,
        address: &NormalizedAddress,
    ) -> Result<(Script, Option<Script>), ChainError>;

    /// Parse a native ledger address (merchant beneficiary)
    async fn parse_address(&self, address: &str) -> Result<Script, ChainError>;

    async fn hex_to_normal(
        &self,
        chain: ChainType,
        address_hex: &str,
        algorithm_id: u8,
    ) -> Result<String, ChainError>;
}

/// Read side of the cell inventory
#[async_trait]
pub trait CellIndexer: Send + Sync {
    async fn live_cells(&self, lock: &Script, order: SearchOrder)
    -> Result<Vec<LiveCell>, ChainError>;
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn submit(&self, tx: &SignedTx) -> Result<String, SubmissionError>;

    async fn get_transaction(&self, hash: &str) -> Result<Option<serde_json::Value>, ChainError>;
}

/// Authorized passkey list of a webauthn owner
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Position of `signer` in `owner`'s key list, `None` when absent
    async fn index_of(
        &self,
        owner: &NormalizedAddress,
        signer: &NormalizedAddress,
    ) -> Result<Option<u8>, ChainError>;
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// USD per whole CKB
    async fn ckb_quote(&self) -> Result<Decimal, ChainError>;

    async fn token_quote(&self, token: &PayTokenId) -> Result<Option<TokenQuote>, ChainError>;
}

/// Witness and signature plumbing of the ledger SDK
#[async_trait]
pub trait TxCodec: Send + Sync {
    async fn action_witness(&self, action: TxAction) -> Result<String, ChainError>;

    async fn sign_list(
        &self,
        tx: &UnsignedTx,
        signer: &NormalizedAddress,
    ) -> Result<Vec<SignData>, ChainError>;

    async fn inject_key_index(&self, sign: &SignData, index: u8) -> Result<SignData, ChainError>;

    async fn attach_signatures(
        &self,
        tx: &UnsignedTx,
        signs: &[SignData],
    ) -> Result<SignedTx, ChainError>;

    async fn tx_hash(&self, tx: &SignedTx) -> Result<String, ChainError>;
}

/// All ledger collaborators, shared by every request handler
#[derive(Clone)]
pub struct ChainClients {
    pub codec: Arc<dyn AddressCodec>,
    pub indexer: Arc<dyn CellIndexer>,
    pub ledger: Arc<dyn LedgerRpc>,
    pub keys: Arc<dyn KeyDirectory>,
    pub quotes: Arc<dyn QuoteSource>,
    pub tx_codec: Arc<dyn TxCodec>,
}

impl ChainClients {
    /// Every collaborator backed by one JSON-RPC client
    pub fn from_rpc(rpc: Arc<rpc::JsonRpcChain>) -> Self {
        Self {
            codec: rpc.clone(),
            indexer: rpc.clone(),
            ledger: rpc.clone(),
            keys: rpc.clone(),
            quotes: rpc.clone(),
            tx_codec: rpc,
        }
    }
}
