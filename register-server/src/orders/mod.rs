//! Order creation
//!
//! validate → request lock / unpaid ceiling → availability → price
//! (→ coupon) → persist → notify. Nothing durable is written before the
//! final persist, and the coupon lock is released on every path once held.

mod detail;
mod notify;
mod validate;

pub use notify::{LogNotifier, OrderNotifier};
pub use validate::{CROSS_COIN_TYPE_ETH, check_years, is_valid_coin_type, normalize_account};

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Coupon, NULL_OWNER, Order, OrderContent, OrderStatus, OrderType, PayTokenId, RegisterStatus,
    TxAction, TxStatus,
};
use shared::request::{CouponCheckRequest, OrderRegisterRequest};
use shared::response::{CouponCheckResponse, OrderRegisterResponse};
use shared::util::{ACCOUNT_SUFFIX, account_char_len, account_id, create_order_id, now_millis};

use crate::chain::{ChainClients, NormalizedAddress, SearchOrder};
use crate::config::{Config, FundingConfig};
use crate::coupon::CouponLedger;
use crate::db::Store;
use crate::error::{ServiceError, ServiceResult};
use crate::funding::CellInventory;
use crate::guard::RateGuard;
use crate::pricing::{OrderAmount, PriceQuery, PricingEngine};

const ORDER_ID_ATTEMPTS: usize = 3;

/// Account lists and receipt addresses consulted by order creation
#[derive(Debug, Clone, Default)]
pub struct OrderPolicy {
    /// Receipt address per pay-token chain
    pub pay_addresses: HashMap<String, String>,
    /// Inviters that also become the order's channel
    pub inviter_whitelist: Vec<String>,
    pub reserved_accounts: Vec<String>,
    pub unavailable_accounts: Vec<String>,
}

impl OrderPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pay_addresses: config.pay_addresses.clone(),
            inviter_whitelist: config.inviter_whitelist.clone(),
            reserved_accounts: config.reserved_accounts.clone(),
            unavailable_accounts: config.unavailable_accounts.clone(),
        }
    }

    pub fn is_reserved(&self, account: &str) -> bool {
        listed(&self.reserved_accounts, account)
    }

    pub fn is_unavailable(&self, account: &str) -> bool {
        listed(&self.unavailable_accounts, account)
    }

    fn is_whitelisted_inviter(&self, account: &str) -> bool {
        listed(&self.inviter_whitelist, account)
    }
}

/// Lists may hold either `name` or `name.bit`
fn listed(list: &[String], account: &str) -> bool {
    let name = account.strip_suffix(ACCOUNT_SUFFIX).unwrap_or(account);
    list.iter().any(|a| a == account || a == name)
}

/// Checked request, ready for pricing
#[derive(Debug, Clone)]
struct OrderDraft {
    account: String,
    account_id: String,
    owner: NormalizedAddress,
    years: u32,
    inviter: String,
    channel: String,
    pay_token: PayTokenId,
    pay_type: String,
    coin_type: String,
    cross_coin_type: String,
}

#[derive(Debug, Clone, Copy)]
enum Referrer {
    Inviter,
    Channel,
}

impl Referrer {
    fn field(self) -> &'static str {
        match self {
            Self::Inviter => "inviter_account",
            Self::Channel => "channel_account",
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    chain: ChainClients,
    store: Arc<dyn Store>,
    guard: RateGuard,
    coupons: CouponLedger,
    pricing: PricingEngine,
    inventory: CellInventory,
    funding: FundingConfig,
    policy: Arc<OrderPolicy>,
    notifier: Arc<dyn OrderNotifier>,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: ChainClients,
        store: Arc<dyn Store>,
        guard: RateGuard,
        coupons: CouponLedger,
        pricing: PricingEngine,
        inventory: CellInventory,
        funding: FundingConfig,
        policy: OrderPolicy,
    ) -> Self {
        Self {
            chain,
            store,
            guard,
            coupons,
            pricing,
            inventory,
            funding,
            policy: Arc::new(policy),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Report the tier of a redeemable gift card
    pub async fn check_coupon(&self, req: &CouponCheckRequest) -> ServiceResult<CouponCheckResponse> {
        if req.code.trim().is_empty() {
            return Err(AppError::invalid_request("gift card is required")
                .with_detail("field", "code")
                .into());
        }
        let coupon = self.coupons.redeem(&req.code).await?;
        let coupon_type = coupon
            .tier()
            .ok_or_else(|| AppError::new(ErrorCode::CouponInvalid))?;
        Ok(CouponCheckResponse { coupon_type })
    }

    pub async fn create_order(&self, req: &OrderRegisterRequest) -> ServiceResult<OrderRegisterResponse> {
        let snapshot = self.pricing.config().snapshot();
        if snapshot.maintenance {
            return Err(AppError::new(ErrorCode::SystemUpgrade).into());
        }

        let mut draft = self.validate(req, snapshot.max_register_years).await?;

        self.guard
            .acquire_request_lock(
                draft.owner.chain_type,
                &draft.owner.address_hex,
                TxAction::ApplyRegister.as_str(),
                &draft.account,
            )
            .await?;
        self.guard
            .check_unpaid_orders(draft.owner.chain_type, &draft.owner.address_hex)
            .await?;
        self.check_availability(&draft).await?;

        let Some(code) = req.gift_card() else {
            return self.place_order(draft, None).await;
        };

        draft.inviter.clear();
        draft.channel.clear();
        let handle = self
            .coupons
            .lock(code, self.guard.config().coupon_lock_ttl)
            .await?;
        let result = match self.redeem_for(&draft, code).await {
            Ok(coupon) => self.place_order(draft, Some(coupon)).await,
            Err(e) => Err(e),
        };
        self.coupons.unlock(&handle).await;
        result
    }

    async fn validate(&self, req: &OrderRegisterRequest, max_years: u32) -> ServiceResult<OrderDraft> {
        let account = normalize_account(&req.account)?;
        if req.address.trim().is_empty() {
            return Err(AppError::invalid_request("address is required")
                .with_detail("field", "address")
                .into());
        }
        if req.pay_token_id.is_internal() {
            return Err(AppError::with_message(
                ErrorCode::PayTypeInvalid,
                format!("pay token {} is not accepted", req.pay_token_id),
            )
            .into());
        }
        if !req.chain_type.is_registrable() {
            return Err(AppError::new(ErrorCode::ChainTypeNotSupported)
                .with_detail("chain_type", req.chain_type.as_db())
                .into());
        }
        let years = check_years(req.register_years, max_years)?;
        if req.gift_card().is_some() && years != 1 {
            return Err(AppError::invalid_request("gift cards are valid for one year only")
                .with_detail("field", "register_years")
                .into());
        }

        let coin_type = req.coin_type().unwrap_or_default();
        if !coin_type.is_empty() && !is_valid_coin_type(coin_type) {
            return Err(AppError::invalid_request(format!("coin type [{coin_type}] invalid"))
                .with_detail("field", "coin_type")
                .into());
        }
        let cross_coin_type = req.cross_coin_type().unwrap_or_default();
        if !cross_coin_type.is_empty() && cross_coin_type != CROSS_COIN_TYPE_ETH {
            return Err(AppError::invalid_request(format!("cross coin type [{cross_coin_type}] invalid"))
                .with_detail("field", "cross_coin_type")
                .into());
        }

        let owner = self.chain.codec.normalize(req.chain_type, req.address.trim()).await?;

        let inviter = match req.inviter() {
            Some(inviter) => self.check_referrer(inviter, Referrer::Inviter).await?,
            None => String::new(),
        };
        let mut channel = match req.channel() {
            Some(channel) => self.check_referrer(channel, Referrer::Channel).await?,
            None => String::new(),
        };
        if !inviter.is_empty() && self.policy.is_whitelisted_inviter(&inviter) {
            channel = inviter.clone();
        }

        Ok(OrderDraft {
            account_id: account_id(&account),
            account,
            owner,
            years,
            inviter,
            channel,
            pay_token: req.pay_token_id.clone(),
            pay_type: req.pay_type.clone(),
            coin_type: coin_type.to_string(),
            cross_coin_type: cross_coin_type.to_string(),
        })
    }

    /// Referenced account must exist, be off cross-chain and have a live owner
    async fn check_referrer(&self, raw: &str, role: Referrer) -> ServiceResult<String> {
        let account = normalize_account(raw).map_err(|e| e.with_detail("field", role.field()))?;
        let Some(info) = self.store.account_info(&account_id(&account)).await? else {
            let err = match role {
                Referrer::Inviter => AppError::new(ErrorCode::InviterAccountNotExist),
                Referrer::Channel => AppError::invalid_request("channel account not exist"),
            };
            return Err(err.with_detail("field", role.field()).into());
        };
        if info.is_on_cross() {
            return Err(AppError::new(ErrorCode::AccountOnCrossChain)
                .with_detail("field", role.field())
                .into());
        }
        if info.has_null_owner() {
            let err = match role {
                Referrer::Inviter => AppError::new(ErrorCode::InviterOwnerInvalid),
                Referrer::Channel => AppError::invalid_request("channel account owner is invalid"),
            };
            return Err(err
                .with_detail("field", role.field())
                .with_detail("owner", NULL_OWNER)
                .into());
        }
        Ok(account)
    }

    async fn check_availability(&self, draft: &OrderDraft) -> ServiceResult<()> {
        if self.policy.is_reserved(&draft.account) {
            return Err(AppError::new(ErrorCode::AccountReserved).into());
        }
        if self.policy.is_unavailable(&draft.account) {
            return Err(AppError::new(ErrorCode::AccountUnavailable).into());
        }
        if self.store.account_info(&draft.account_id).await?.is_some() {
            return Err(AppError::new(ErrorCode::AccountAlreadyRegistered).into());
        }

        let (chain, address) = (draft.owner.chain_type, draft.owner.address_hex.as_str());
        if self.store.self_registering(&draft.account_id, chain, address).await? {
            return Err(AppError::with_message(
                ErrorCode::AccountRegistering,
                "you have already paid for this account",
            )
            .into());
        }
        if self.store.other_registering(&draft.account_id, chain, address).await? {
            return Err(AppError::new(ErrorCode::AccountRegistering).into());
        }
        Ok(())
    }

    async fn redeem_for(&self, draft: &OrderDraft, code: &str) -> ServiceResult<Coupon> {
        let coupon = self.coupons.redeem(code).await?;
        self.coupons
            .check_eligibility(&coupon, account_char_len(&draft.account))?;
        Ok(coupon)
    }

    async fn place_order(
        &self,
        draft: OrderDraft,
        coupon: Option<Coupon>,
    ) -> ServiceResult<OrderRegisterResponse> {
        let name = draft
            .account
            .strip_suffix(ACCOUNT_SUFFIX)
            .unwrap_or(&draft.account);
        let amount = self
            .pricing
            .compute_amount(&PriceQuery {
                account_char_len: account_char_len(&draft.account),
                account_byte_len: name.len(),
                algorithm_id: draft.owner.algorithm_id,
                has_inviter: !draft.inviter.is_empty(),
                years: draft.years,
                is_renew: false,
                pay_token: draft.pay_token.clone(),
            })
            .await?;

        let consistent = match coupon {
            Some(_) => amount.is_zero(),
            None => amount.is_positive(),
        };
        if !consistent {
            tracing::warn!(
                account = %draft.account,
                token = %draft.pay_token,
                usd = %amount.usd,
                ckb = %amount.ckb,
                pay_token = %amount.pay_token,
                coupon = coupon.is_some(),
                "order amount inconsistent"
            );
            return Err(AppError::new(ErrorCode::OrderAmountInconsistent).into());
        }

        if draft.pay_token.is_balance() {
            self.probe_balance(&draft.owner, &amount).await?;
        }

        let receipt_address = match coupon {
            Some(_) => None,
            None => Some(self.receipt_address(&draft.pay_token)?),
        };

        let order = self.build_order(&draft, name, &amount, coupon.is_some()).await?;
        match &coupon {
            Some(c) => self
                .store
                .create_coupon_order(&order, &c.code)
                .await?
                .into_result()?,
            None => self.store.create_order(&order).await?,
        }

        tracing::info!(
            order_id = %order.order_id,
            account = %order.account,
            chain = %order.chain_type,
            token = %order.pay_token_id,
            amount = %order.pay_amount,
            coupon = coupon.is_some(),
            "order created"
        );

        let notifier = self.notifier.clone();
        let created = order.clone();
        tokio::spawn(async move {
            notifier.order_created(&created).await;
        });

        Ok(OrderRegisterResponse {
            order_id: order.order_id,
            token_id: order.pay_token_id,
            receipt_address,
            amount: order.pay_amount,
            pay_type: order.pay_type,
        })
    }

    /// Balance-pay orders must be payable right now; nothing is reserved
    async fn probe_balance(&self, owner: &NormalizedAddress, amount: &OrderAmount) -> ServiceResult<()> {
        let pay = amount.pay_token.to_u64().ok_or_else(|| {
            ServiceError::App(AppError::new(ErrorCode::OrderAmountInconsistent))
        })?;
        let (lock, _) = self.chain.codec.lock_script(owner).await?;
        self.inventory
            .probe(
                &lock,
                pay + self.funding.tx_fee,
                self.funding.user_change_floor,
                SearchOrder::Desc,
            )
            .await?;
        Ok(())
    }

    fn receipt_address(&self, token: &PayTokenId) -> ServiceResult<String> {
        self.policy
            .pay_addresses
            .get(token.chain_string())
            .cloned()
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::UnsupportedToken,
                    format!("no receipt address for {token}"),
                )
                .with_detail("token_id", token.as_str())
                .into()
            })
    }

    async fn new_order_id(&self, draft: &OrderDraft) -> ServiceResult<String> {
        for _ in 0..ORDER_ID_ATTEMPTS {
            let order_id = create_order_id(
                &draft.account,
                draft.owner.chain_type.as_db(),
                &draft.owner.address_hex,
                now_millis(),
            );
            if !self.store.order_exists(&order_id).await? {
                return Ok(order_id);
            }
            tracing::warn!(order_id = %order_id, "order id collision");
        }
        Err(AppError::internal("could not allocate an order id").into())
    }

    async fn build_order(
        &self,
        draft: &OrderDraft,
        name: &str,
        amount: &OrderAmount,
        coupon_funded: bool,
    ) -> ServiceResult<Order> {
        let content = serde_json::to_string(&OrderContent {
            account_char_str: name.to_string(),
            inviter_account: draft.inviter.clone(),
            channel_account: draft.channel.clone(),
            register_years: draft.years,
            amount_total_usd: amount.usd,
            amount_total_ckb: amount.ckb,
        })?;

        Ok(Order {
            order_id: self.new_order_id(draft).await?,
            order_type: OrderType::Own,
            account_id: draft.account_id.clone(),
            account: draft.account.clone(),
            action: TxAction::ApplyRegister,
            chain_type: draft.owner.chain_type,
            address: draft.owner.address_hex.clone(),
            timestamp: now_millis(),
            pay_token_id: draft.pay_token.clone(),
            pay_type: draft.pay_type.clone(),
            pay_amount: amount.pay_token,
            content,
            pay_status: if coupon_funded {
                TxStatus::Sending
            } else {
                TxStatus::Default
            },
            hedge_status: TxStatus::Default,
            pre_register_status: TxStatus::Default,
            order_status: OrderStatus::Default,
            register_status: RegisterStatus::ConfirmPayment,
            coin_type: draft.coin_type.clone(),
            cross_coin_type: draft.cross_coin_type.clone(),
        })
    }
}
