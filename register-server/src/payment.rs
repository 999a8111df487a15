//! Balance payment (build phase)
//!
//! Pays an order priced in `ckb_das` straight from the user's ledger
//! balance: select and reserve funding cells, assemble the transfer and
//! park it in the sign cache for off-box signing.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, TxAction, TxStatus};
use shared::request::BalancePayRequest;
use shared::response::SignInfo;

use crate::chain::{CellOutput, ChainClients, ChainError, NormalizedAddress, OutPoint, SearchOrder};
use crate::config::FundingConfig;
use crate::db::Store;
use crate::error::{ServiceError, ServiceResult};
use crate::funding::{CellInventory, FundingError, Selection, assemble, split_change};
use crate::guard::RateGuard;
use crate::pricing::PriceConfigHandle;
use crate::sign_cache::{SignCache, SignInfoCache};

#[derive(Clone)]
pub struct PaymentService {
    chain: ChainClients,
    store: Arc<dyn Store>,
    inventory: CellInventory,
    cache: SignCache,
    guard: RateGuard,
    prices: PriceConfigHandle,
    funding: FundingConfig,
    /// Beneficiary of balance payments
    pay_address: String,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: ChainClients,
        store: Arc<dyn Store>,
        inventory: CellInventory,
        cache: SignCache,
        guard: RateGuard,
        prices: PriceConfigHandle,
        funding: FundingConfig,
        pay_address: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            store,
            inventory,
            cache,
            guard,
            prices,
            funding,
            pay_address: pay_address.into(),
        }
    }

    async fn load_order(&self, req: &BalancePayRequest, owner: &NormalizedAddress) -> ServiceResult<Order> {
        let order = self
            .store
            .get_order(&req.order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

        if order.chain_type != owner.chain_type || !order.address.eq_ignore_ascii_case(&owner.address_hex) {
            return Err(AppError::invalid_request("order does not belong to this address").into());
        }
        if order.pay_status != TxStatus::Default {
            return Err(AppError::new(ErrorCode::OrderAlreadyPaid).into());
        }
        if !order.pay_token_id.is_balance() {
            return Err(AppError::with_message(
                ErrorCode::PayTypeInvalid,
                format!("order is payable with {}, not balance", order.pay_token_id),
            )
            .into());
        }
        Ok(order)
    }

    pub async fn build_balance_payment(&self, req: &BalancePayRequest) -> ServiceResult<SignInfo> {
        if self.prices.snapshot().maintenance {
            return Err(AppError::new(ErrorCode::SystemUpgrade).into());
        }

        let owner = self.chain.codec.normalize(req.chain_type, req.address.trim()).await?;
        let order = self.load_order(req, &owner).await?;
        self.guard
            .check_api_limit(owner.chain_type, &order.address, TxAction::Transfer.as_str())
            .await?;
        self.guard.check_account_limit(&order.account).await?;

        let pay = order
            .pay_amount
            .to_u64()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                ServiceError::Db(format!("order {} has pay amount {}", order.order_id, order.pay_amount).into())
            })?;

        let hold = self.cache.ttl();

        // Tiny payments are topped up with merchant cells so the payment
        // output is always a valid cell.
        let merchant = if pay <= self.funding.min_cell_capacity {
            let beneficiary = self.chain.codec.parse_address(&self.pay_address).await?;
            Some(
                self.inventory
                    .select(
                        &beneficiary,
                        self.funding.min_cell_capacity,
                        self.funding.merchant_change_floor,
                        SearchOrder::Desc,
                        hold,
                    )
                    .await?,
            )
        } else {
            None
        };

        let (user_lock, _) = match self.chain.codec.lock_script(&owner).await {
            Ok(scripts) => scripts,
            Err(e) => {
                self.release(merchant.as_ref(), None);
                return Err(e.into());
            }
        };
        let user = match self
            .inventory
            .select(
                &user_lock,
                pay + self.funding.tx_fee,
                self.funding.user_change_floor,
                SearchOrder::Desc,
                hold,
            )
            .await
        {
            Ok(selection) => selection,
            Err(e) => {
                self.release(merchant.as_ref(), None);
                return Err(e.into());
            }
        };

        match self.build(&order, &owner, pay, &user, merchant.as_ref()).await {
            Ok(info) => Ok(info),
            Err(e) => {
                self.release(merchant.as_ref(), Some(&user));
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        order: &Order,
        owner: &NormalizedAddress,
        pay: u64,
        user: &Selection,
        merchant: Option<&Selection>,
    ) -> ServiceResult<SignInfo> {
        let (change_lock, change_type) = self.chain.codec.lock_script(owner).await?;
        let beneficiary = self.chain.codec.parse_address(&self.pay_address).await?;
        let witness = self
            .chain
            .tx_codec
            .action_witness(TxAction::Transfer)
            .await
            .map_err(|e| match e {
                ChainError::Transport(msg) => ServiceError::Upstream(msg.into()),
                other => FundingError::Build(other.to_string()).into(),
            })?;

        let merchant_total = merchant.map_or(0, |m| m.total);
        let change = user.total - pay - self.funding.tx_fee;
        let change_parts = split_change(
            change,
            self.funding.change_split_base,
            self.funding.change_split_limit,
            SearchOrder::Desc,
        );

        let mut inputs = user.cells.clone();
        if let Some(m) = merchant {
            inputs.extend(m.cells.iter().cloned());
        }
        let payment = CellOutput {
            capacity: pay + merchant_total,
            lock: beneficiary,
            type_script: None,
        };
        let data = format!("0x{}", hex::encode(order.order_id.as_bytes()));

        let tx = assemble(
            &inputs,
            vec![(payment, data)],
            &change_lock,
            change_type.as_ref(),
            &change_parts,
            witness,
        )?;

        let sign_list = self.chain.tx_codec.sign_list(&tx, owner).await?;

        let reserved_cells: Vec<OutPoint> = inputs.iter().map(|c| c.out_point.clone()).collect();
        let sign_key = self
            .cache
            .put(SignInfoCache {
                action: TxAction::Transfer,
                account: order.account.clone(),
                chain_type: order.chain_type,
                address: order.address.clone(),
                owner: owner.clone(),
                capacity: pay,
                tx,
                reserved_cells,
                auction_info: None,
                expires_at: 0,
            })
            .await?;

        tracing::info!(
            order_id = %order.order_id,
            account = %order.account,
            pay,
            inputs = inputs.len(),
            "balance payment built"
        );

        Ok(SignInfo {
            sign_key,
            sign_list,
        })
    }

    fn release(&self, merchant: Option<&Selection>, user: Option<&Selection>) {
        for selection in [merchant, user].into_iter().flatten() {
            self.inventory.release(&selection.out_points());
        }
    }
}
