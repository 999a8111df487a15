//! JSON-RPC client for the ledger node, the cell indexer and the SDK sidecar
//!
//! Plain `reqwest` + `serde_json::Value`; the SDK sidecar owns every encoding
//! concern (addresses, witnesses, signature placement).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use shared::models::{ChainType, PayTokenId, SignData, TxAction};

use super::{
    AddressCodec, CellIndexer, ChainError, KeyDirectory, LedgerRpc, LiveCell, NormalizedAddress,
    OutPoint, QuoteSource, Script, SearchOrder, SignedTx, SubmissionError, TokenQuote, TxCodec,
    UnsignedTx,
};

const INDEXER_PAGE_SIZE: u64 = 100;
const INDEXER_MAX_PAGES: usize = 20;

#[derive(Debug)]
enum CallError {
    Transport(String),
    Rpc { code: i64, message: String },
}

impl From<CallError> for ChainError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Transport(msg) => ChainError::Transport(msg),
            CallError::Rpc { code, message } => {
                ChainError::InvalidData(format!("rpc error {code}: {message}"))
            }
        }
    }
}

pub struct JsonRpcChain {
    client: reqwest::Client,
    node_url: String,
    indexer_url: String,
    sdk_url: String,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    pub fn new(node_url: String, indexer_url: String, sdk_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            node_url,
            indexer_url,
            sdk_url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Value,
    ) -> Result<T, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp: Value = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        if let Some(err) = resp.get("error").filter(|e| !e.is_null()) {
            return Err(CallError::Rpc {
                code: err["code"].as_i64().unwrap_or_default(),
                message: err["message"].as_str().unwrap_or_default().to_string(),
            });
        }

        serde_json::from_value(resp["result"].clone()).map_err(|e| CallError::Rpc {
            code: 0,
            message: format!("{method}: unexpected result shape: {e}"),
        })
    }

    async fn sdk<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        Ok(self.call(&self.sdk_url, method, params).await?)
    }
}

fn to_value<T: Serialize>(v: &T) -> Result<Value, ChainError> {
    serde_json::to_value(v).map_err(|e| ChainError::InvalidData(e.to_string()))
}

fn parse_hex_u64(s: &str) -> Result<u64, ChainError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| ChainError::InvalidData(format!("{s}: {e}")))
}

fn parse_script(v: &Value) -> Result<Script, ChainError> {
    serde_json::from_value(v.clone()).map_err(|e| ChainError::InvalidData(e.to_string()))
}

fn parse_indexer_cell(obj: &Value) -> Result<LiveCell, ChainError> {
    let output = &obj["output"];
    let out_point = &obj["out_point"];
    Ok(LiveCell {
        out_point: OutPoint::new(
            out_point["tx_hash"].as_str().unwrap_or_default(),
            parse_hex_u64(out_point["index"].as_str().unwrap_or("0x0"))? as u32,
        ),
        capacity: parse_hex_u64(output["capacity"].as_str().unwrap_or("0x0"))?,
        lock: parse_script(&output["lock"])?,
        type_script: match &output["type"] {
            Value::Null => None,
            v => Some(parse_script(v)?),
        },
    })
}

#[async_trait]
impl AddressCodec for JsonRpcChain {
    async fn normalize(
        &self,
        chain: ChainType,
        address: &str,
    ) -> Result<NormalizedAddress, ChainError> {
        self.call(&self.sdk_url, "address_normalize", json!([chain, address]))
            .await
            .map_err(|e| match e {
                CallError::Rpc { message, .. } => ChainError::AddressFormat(message),
                CallError::Transport(msg) => ChainError::Transport(msg),
            })
    }

    async fn lock_script(
        &self,
        address: &NormalizedAddress,
    ) -> Result<(Script, Option<Script>), ChainError> {
        let v: Value = self.sdk("address_lock_script", json!([address])).await?;
        let lock = parse_script(&v["lock"])?;
        let type_script = match &v["type"] {
            Value::Null => None,
            t => Some(parse_script(t)?),
        };
        Ok((lock, type_script))
    }

    async fn parse_address(&self, address: &str) -> Result<Script, ChainError> {
        self.call(&self.sdk_url, "address_parse", json!([address]))
            .await
            .map_err(|e| match e {
                CallError::Rpc { message, .. } => ChainError::AddressFormat(message),
                CallError::Transport(msg) => ChainError::Transport(msg),
            })
    }

    async fn hex_to_normal(
        &self,
        chain: ChainType,
        address_hex: &str,
        algorithm_id: u8,
    ) -> Result<String, ChainError> {
        self.sdk(
            "address_hex_to_normal",
            json!([chain, address_hex, algorithm_id]),
        )
        .await
    }
}

#[async_trait]
impl CellIndexer for JsonRpcChain {
    async fn live_cells(
        &self,
        lock: &Script,
        order: SearchOrder,
    ) -> Result<Vec<LiveCell>, ChainError> {
        let search_key = json!({
            "script": lock,
            "script_type": "lock",
            "with_data": false,
        });
        let mut cells = Vec::new();
        let mut cursor = Value::Null;

        for _ in 0..INDEXER_MAX_PAGES {
            let page: Value = self
                .call(
                    &self.indexer_url,
                    "get_cells",
                    json!([search_key, order, format!("{:#x}", INDEXER_PAGE_SIZE), cursor]),
                )
                .await?;

            let objects = page["objects"].as_array().cloned().unwrap_or_default();
            for obj in &objects {
                cells.push(parse_indexer_cell(obj)?);
            }

            match page["last_cursor"].as_str() {
                Some(c) if !c.is_empty() && objects.len() as u64 == INDEXER_PAGE_SIZE => {
                    cursor = Value::String(c.to_string());
                }
                _ => break,
            }
        }

        Ok(cells)
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcChain {
    async fn submit(&self, tx: &SignedTx) -> Result<String, SubmissionError> {
        self.call(&self.node_url, "send_transaction", json!([tx.raw, "passthrough"]))
            .await
            .map_err(|e| match e {
                CallError::Transport(msg) => SubmissionError::Transport(msg),
                CallError::Rpc { code, message } => {
                    SubmissionError::Node(format!("code {code}: {message}"))
                }
            })
    }

    async fn get_transaction(&self, hash: &str) -> Result<Option<Value>, ChainError> {
        let v: Value = self.call(&self.node_url, "get_transaction", json!([hash])).await?;
        Ok(match v {
            Value::Null => None,
            v => Some(v),
        })
    }
}

#[async_trait]
impl KeyDirectory for JsonRpcChain {
    async fn index_of(
        &self,
        owner: &NormalizedAddress,
        signer: &NormalizedAddress,
    ) -> Result<Option<u8>, ChainError> {
        let idx: i64 = self.sdk("key_index", json!([owner, signer])).await?;
        Ok(u8::try_from(idx).ok())
    }
}

#[async_trait]
impl QuoteSource for JsonRpcChain {
    async fn ckb_quote(&self) -> Result<Decimal, ChainError> {
        self.sdk("quote_ckb", json!([])).await
    }

    async fn token_quote(&self, token: &PayTokenId) -> Result<Option<TokenQuote>, ChainError> {
        self.sdk("quote_token", json!([token])).await
    }
}

#[async_trait]
impl TxCodec for JsonRpcChain {
    async fn action_witness(&self, action: TxAction) -> Result<String, ChainError> {
        self.call(&self.sdk_url, "witness_action", json!([action]))
            .await
            .map_err(|e| match e {
                CallError::Rpc { message, .. } => ChainError::Witness(message),
                CallError::Transport(msg) => ChainError::Transport(msg),
            })
    }

    async fn sign_list(
        &self,
        tx: &UnsignedTx,
        signer: &NormalizedAddress,
    ) -> Result<Vec<SignData>, ChainError> {
        self.sdk("tx_sign_list", json!([to_value(tx)?, signer])).await
    }

    async fn inject_key_index(&self, sign: &SignData, index: u8) -> Result<SignData, ChainError> {
        self.sdk("sign_inject_key_index", json!([sign, index])).await
    }

    async fn attach_signatures(
        &self,
        tx: &UnsignedTx,
        signs: &[SignData],
    ) -> Result<SignedTx, ChainError> {
        self.sdk("tx_attach_signatures", json!([to_value(tx)?, signs]))
            .await
    }

    async fn tx_hash(&self, tx: &SignedTx) -> Result<String, ChainError> {
        self.sdk("tx_hash", json!([tx.raw])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_u64("0x174876e800").unwrap(), 100_000_000_000);
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn indexer_cell_parsing() {
        let obj = json!({
            "output": {
                "capacity": "0x2540be400",
                "lock": {"code_hash": "0xaa", "hash_type": "type", "args": "0x01"},
                "type": null
            },
            "out_point": {"tx_hash": "0xbeef", "index": "0x1"}
        });
        let cell = parse_indexer_cell(&obj).unwrap();
        assert_eq!(cell.capacity, 10_000_000_000);
        assert_eq!(cell.out_point, OutPoint::new("0xbeef", 1));
        assert!(cell.type_script.is_none());
        assert_eq!(cell.lock.args, "0x01");
    }
}
