//! Pricing engine
//!
//! Turns (account length, years, pay token) plus live quotes into a USD
//! total, a CKB total in shannons and a pay-token total in the token's base
//! units. Every rounding step goes up.

mod snapshot;

pub use snapshot::{LengthPrice, PriceConfigHandle, PriceSnapshot};

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{PayTokenId, TokenRounding};
use thiserror::Error;

use crate::chain::{ChainError, ONE_CKB, QuoteSource};
use crate::error::ServiceError;

const MICRO: i64 = 1_000_000;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no active quote for token {0}")]
    UnsupportedToken(String),
    #[error("no price configured for account length {0}")]
    NoPrice(usize),
    #[error("invalid quote: {0}")]
    InvalidQuote(String),
    #[error("price config: {0}")]
    Config(String),
    #[error(transparent)]
    Quote(#[from] ChainError),
}

impl From<PricingError> for ServiceError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::UnsupportedToken(token) => ServiceError::App(
                AppError::with_message(ErrorCode::UnsupportedToken, format!("unsupported pay token {token}"))
                    .with_detail("token_id", token),
            ),
            PricingError::NoPrice(len) => ServiceError::App(
                AppError::with_message(ErrorCode::RegistrationNotOpen, "registration is not open")
                    .with_detail("account_length", len),
            ),
            PricingError::Quote(chain) => chain.into(),
            other => ServiceError::Upstream(other.into()),
        }
    }
}

/// Inputs of one price computation
#[derive(Debug, Clone)]
pub struct PriceQuery {
    /// Characters, `.bit` excluded
    pub account_char_len: usize,
    /// UTF-8 bytes, `.bit` excluded; drives the occupied capacity
    pub account_byte_len: usize,
    /// Owner signing algorithm; selects the basic capacity
    pub algorithm_id: u8,
    pub has_inviter: bool,
    pub years: u32,
    pub is_renew: bool,
    pub pay_token: PayTokenId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAmount {
    /// USD, 2 decimal places
    pub usd: Decimal,
    /// Shannons
    pub ckb: Decimal,
    /// Pay-token base units
    pub pay_token: Decimal,
}

impl OrderAmount {
    pub fn zero() -> Self {
        Self {
            usd: Decimal::ZERO,
            ckb: Decimal::ZERO,
            pay_token: Decimal::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.usd.is_zero() && self.ckb.is_zero() && self.pay_token.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.usd.is_sign_positive()
            && !self.usd.is_zero()
            && !self.ckb.is_zero()
            && !self.pay_token.is_zero()
    }
}

fn ceil_dp(v: Decimal, dp: u32) -> Decimal {
    v.round_dp_with_strategy(dp, RoundingStrategy::ToPositiveInfinity)
}

fn pow10(exp: u32) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(exp), 0)
}

#[derive(Clone)]
pub struct PricingEngine {
    config: PriceConfigHandle,
    quotes: Arc<dyn QuoteSource>,
}

impl PricingEngine {
    pub fn new(config: PriceConfigHandle, quotes: Arc<dyn QuoteSource>) -> Self {
        Self { config, quotes }
    }

    pub fn config(&self) -> &PriceConfigHandle {
        &self.config
    }

    /// USD per CKB, rejecting non-positive quotes
    async fn ckb_quote(&self) -> Result<Decimal, PricingError> {
        let quote = self.quotes.ckb_quote().await?;
        if quote <= Decimal::ZERO {
            return Err(PricingError::InvalidQuote(format!("ckb quote {quote}")));
        }
        Ok(quote)
    }

    /// Base amount in USD (6 dp) for the occupied capacity of a new account cell
    pub fn base_amount_usd(
        snapshot: &PriceSnapshot,
        account_byte_len: usize,
        algorithm_id: u8,
        usd_per_ckb: Decimal,
    ) -> Decimal {
        let shannons = Decimal::from(snapshot.basic_capacity(algorithm_id))
            + Decimal::from(account_byte_len as u64 * ONE_CKB)
            + Decimal::from(snapshot.prepared_fee);
        ceil_dp(shannons / Decimal::from(ONE_CKB) * usd_per_ckb, 6)
    }

    /// Yearly unit price in USD
    pub fn unit_price_usd(
        snapshot: &PriceSnapshot,
        account_char_len: usize,
        is_renew: bool,
    ) -> Result<Decimal, PricingError> {
        let unit = snapshot
            .unit_price(account_char_len)
            .ok_or(PricingError::NoPrice(account_char_len))?;
        let micro = if is_renew { unit.renew } else { unit.new };
        Ok(Decimal::from(micro) / Decimal::from(MICRO))
    }

    /// Base amount and yearly renewal price (USD) shown for an existing account
    pub async fn renewal_quote(
        &self,
        account_char_len: usize,
        account_byte_len: usize,
        algorithm_id: u8,
    ) -> Result<(Decimal, Decimal), PricingError> {
        let snapshot = self.config.snapshot();
        let renew = Self::unit_price_usd(&snapshot, account_char_len, true)?;
        let usd_per_ckb = self.ckb_quote().await?;
        let base = Self::base_amount_usd(&snapshot, account_byte_len, algorithm_id, usd_per_ckb);
        Ok((base, renew))
    }

    pub async fn compute_amount(&self, query: &PriceQuery) -> Result<OrderAmount, PricingError> {
        if query.pay_token.is_coupon() {
            return Ok(OrderAmount::zero());
        }

        let snapshot = self.config.snapshot();
        let token_quote = self
            .quotes
            .token_quote(&query.pay_token)
            .await?
            .ok_or_else(|| PricingError::UnsupportedToken(query.pay_token.to_string()))?;
        if token_quote.price <= Decimal::ZERO {
            return Err(PricingError::InvalidQuote(format!(
                "{} quote {}",
                query.pay_token, token_quote.price
            )));
        }
        let usd_per_ckb = self.ckb_quote().await?;

        let mut usd = Self::unit_price_usd(&snapshot, query.account_char_len, query.is_renew)?
            * Decimal::from(query.years);

        if query.has_inviter && snapshot.inviter_discount > 0 {
            let rate = Decimal::from(snapshot.inviter_discount) / Decimal::from(10_000);
            usd *= Decimal::ONE - rate;
        }
        if !query.is_renew {
            usd += Self::base_amount_usd(
                &snapshot,
                query.account_byte_len,
                query.algorithm_id,
                usd_per_ckb,
            );
        }
        if snapshot.premium > Decimal::ZERO {
            usd *= Decimal::ONE + snapshot.premium;
        }
        if snapshot.discount > Decimal::ZERO {
            usd *= snapshot.discount;
        }
        let usd = ceil_dp(usd, 2);

        let ckb = (usd / usd_per_ckb * Decimal::from(ONE_CKB)).ceil();

        let pay_token = match query.pay_token.rounding() {
            TokenRounding::Native => ckb,
            TokenRounding::Exact => (usd / token_quote.price * pow10(token_quote.decimals)).ceil(),
            TokenRounding::Micro => {
                let exact = (usd / token_quote.price * pow10(token_quote.decimals)).ceil();
                let step = Decimal::from(MICRO);
                (exact / step).ceil() * step
            }
        };

        tracing::debug!(
            token = %query.pay_token,
            years = query.years,
            usd = %usd,
            ckb = %ckb,
            pay_token = %pay_token,
            "order amount computed"
        );

        Ok(OrderAmount { usd, ckb, pay_token })
    }
}
