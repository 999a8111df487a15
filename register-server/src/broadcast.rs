//! Broadcast and settlement
//!
//! Send phase of the build → sign → send protocol: consume the sign-cache
//! entry, place passkey key indexes, attach signatures, submit, classify
//! the outcome and record the bookkeeping of a successful broadcast.

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    AuctionOrder, ChainType, PendingTransactionRecord, SignData, TxAction,
};
use shared::request::TransactionSendRequest;
use shared::util::{account_id, now_millis};

use crate::chain::{ChainClients, ChainError, OutPoint, SubmissionError};
use crate::config::FundingConfig;
use crate::db::Store;
use crate::error::{ServiceError, ServiceResult};
use crate::funding::CellInventory;
use crate::guard::RateGuard;
use crate::sign_cache::{SignCache, SignInfoCache};

/// How a refused submission should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Inputs already spent, unknown, or the tx is a duplicate: rebuild
    RejectedOutPoint,
    /// Node backpressure: back off and resend
    LedgerBusy,
    /// Anything else
    Failed,
}

impl SendFailure {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RejectedOutPoint => ErrorCode::RejectedOutPoint,
            Self::LedgerBusy => ErrorCode::LedgerBusy,
            Self::Failed => ErrorCode::TxSendFailed,
        }
    }

    /// The same signed transaction may be submitted again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RejectedOutPoint)
    }
}

/// Map ledger error text onto a [`SendFailure`]
pub fn classify_send_error(text: &str) -> SendFailure {
    if text.contains("PoolRejectedDuplicatedTransaction")
        || text.contains("Dead(OutPoint(")
        || text.contains("Unknown(OutPoint(")
        || (text.contains("getInputCell") && text.contains("not live"))
    {
        SendFailure::RejectedOutPoint
    } else if text.contains("-102 in the page") {
        SendFailure::LedgerBusy
    } else {
        SendFailure::Failed
    }
}

/// Outcome of the part of a send that runs after the cache entry was taken
enum Attempt {
    Accepted(String),
    /// Entry goes back into the cache so the client can resend
    Retry(ServiceError),
    /// Entry is dropped and its cells released
    Rejected(ServiceError),
}

#[derive(Clone)]
pub struct TxSender {
    chain: ChainClients,
    cache: SignCache,
    inventory: CellInventory,
    guard: RateGuard,
    store: Arc<dyn Store>,
    funding: FundingConfig,
}

impl TxSender {
    pub fn new(
        chain: ChainClients,
        cache: SignCache,
        inventory: CellInventory,
        guard: RateGuard,
        store: Arc<dyn Store>,
        funding: FundingConfig,
    ) -> Self {
        Self {
            chain,
            cache,
            inventory,
            guard,
            store,
            funding,
        }
    }

    pub async fn send(&self, req: &TransactionSendRequest) -> ServiceResult<String> {
        let entry = self.cache.take(&req.sign_key).await?;

        match self.attempt(&entry, req).await {
            Attempt::Accepted(hash) => {
                tracing::info!(
                    hash = %hash,
                    account = %entry.account,
                    action = %entry.action,
                    "transaction broadcast"
                );
                self.settle(&entry, &hash).await;
                Ok(hash)
            }
            Attempt::Retry(err) => {
                match self.cache.restore(&req.sign_key, &entry).await {
                    Ok(true) => {}
                    Ok(false) => self.inventory.release(&entry.reserved_cells),
                    Err(e) => {
                        tracing::warn!(error = %e, sign_key = %req.sign_key, "sign cache restore failed");
                    }
                }
                Err(err)
            }
            Attempt::Rejected(err) => {
                self.inventory.release(&entry.reserved_cells);
                Err(err)
            }
        }
    }

    async fn attempt(&self, entry: &SignInfoCache, req: &TransactionSendRequest) -> Attempt {
        let signs = match self.place_key_indexes(entry, req).await {
            Ok(signs) => signs,
            Err(e) => return Attempt::Retry(e),
        };

        let signed = match self.chain.tx_codec.attach_signatures(&entry.tx, &signs).await {
            Ok(signed) => signed,
            Err(ChainError::Transport(msg)) => {
                return Attempt::Retry(ServiceError::Upstream(msg.into()));
            }
            Err(e) => {
                return Attempt::Retry(
                    AppError::with_message(ErrorCode::SignatureInvalid, e.to_string()).into(),
                );
            }
        };
        let expected_hash = match self.chain.tx_codec.tx_hash(&signed).await {
            Ok(hash) => hash,
            Err(e) => return Attempt::Retry(e.into()),
        };

        match self.chain.ledger.submit(&signed).await {
            Ok(hash) => Attempt::Accepted(hash),
            Err(SubmissionError::Node(text)) => {
                let failure = classify_send_error(&text);
                tracing::warn!(
                    error = %text,
                    outcome = ?failure,
                    account = %entry.account,
                    "ledger refused transaction"
                );
                let err = AppError::new(failure.code()).into();
                if failure.is_retryable() {
                    Attempt::Retry(err)
                } else if self.already_on_ledger(&expected_hash).await {
                    // An earlier submission landed after its reply was lost
                    Attempt::Accepted(expected_hash)
                } else {
                    Attempt::Rejected(err)
                }
            }
            Err(SubmissionError::Transport(msg)) => {
                // The node may have accepted it before the connection dropped
                if self.already_on_ledger(&expected_hash).await {
                    Attempt::Accepted(expected_hash)
                } else {
                    tracing::error!(error = %msg, hash = %expected_hash, "ledger unreachable");
                    Attempt::Retry(AppError::new(ErrorCode::TxSendFailed).into())
                }
            }
        }
    }

    async fn already_on_ledger(&self, hash: &str) -> bool {
        match self.chain.ledger.get_transaction(hash).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, hash = %hash, "transaction lookup failed");
                false
            }
        }
    }

    /// Resolve the passkey signer's position in the owner's key list and
    /// inject it into every passkey signature
    async fn place_key_indexes(
        &self,
        entry: &SignInfoCache,
        req: &TransactionSendRequest,
    ) -> ServiceResult<Vec<SignData>> {
        if !req.sign_list.iter().any(SignData::is_webauthn) {
            return Ok(req.sign_list.clone());
        }

        let sign_address = req
            .sign_address()
            .ok_or_else(|| AppError::invalid_request("sign_address is required for passkey signatures"))?;
        let signer = self
            .chain
            .codec
            .normalize(ChainType::Webauthn, sign_address)
            .await
            .map_err(|e| match e {
                ChainError::AddressFormat(msg) => ServiceError::App(AppError::invalid_request(msg)),
                other => other.into(),
            })?;

        let index = self
            .chain
            .keys
            .index_of(&entry.owner, &signer)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "key index lookup failed");
                AppError::invalid_request("failed to resolve signer key index")
            })?
            .ok_or_else(|| AppError::permission_denied("signer is not an authorized key of this account"))?;

        let mut signs = Vec::with_capacity(req.sign_list.len());
        for sign in &req.sign_list {
            if sign.is_webauthn() {
                signs.push(self.chain.tx_codec.inject_key_index(sign, index).await?);
            } else {
                signs.push(sign.clone());
            }
        }
        Ok(signs)
    }

    /// Post-broadcast bookkeeping. The transaction is already on the
    /// ledger, so failures here are logged and never returned.
    async fn settle(&self, entry: &SignInfoCache, hash: &str) {
        if let Err(e) = self
            .guard
            .set_api_limit(entry.chain_type, &entry.address, entry.action.as_str())
            .await
        {
            tracing::error!(error = %e, "set api limit failed");
        }
        if let Err(e) = self.guard.set_account_limit(&entry.account).await {
            tracing::error!(error = %e, "set account limit failed");
        }

        self.inventory
            .mark_consumed(&entry.tx.inputs, self.funding.consumed_cell_ttl);

        let outpoint = OutPoint::new(hash, 0).to_string();
        let pending = PendingTransactionRecord {
            account: entry.account.clone(),
            action: entry.action.as_str().to_string(),
            chain_type: entry.chain_type.as_db(),
            address: entry.address.clone(),
            capacity: entry.capacity as i64,
            outpoint: outpoint.clone(),
            block_timestamp: now_millis(),
        };
        if let Err(e) = self.store.create_pending(&pending).await {
            tracing::error!(error = %e, outpoint = %outpoint, "create pending record failed");
        }

        if entry.action == TxAction::BidExpiredAccountAuction {
            let Some(info) = &entry.auction_info else {
                tracing::error!(outpoint = %outpoint, "bid without auction info");
                return;
            };
            let order = AuctionOrder {
                account: entry.account.clone(),
                account_id: account_id(&entry.account),
                address: entry.address.clone(),
                basic_price: info.basic_price,
                premium_price: info.premium_price,
                bid_time: info.bid_time,
                algorithm_id: entry.owner.algorithm_id as i16,
                sub_algorithm_id: entry.owner.sub_algorithm_id as i16,
                chain_type: entry.chain_type.as_db(),
                outpoint: outpoint.clone(),
            };
            if let Err(e) = self.store.create_auction_order(&order).await {
                tracing::error!(error = %e, outpoint = %outpoint, "create auction order failed");
            }
        }
    }
}
