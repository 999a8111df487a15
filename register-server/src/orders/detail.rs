use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{AccountInfo, ChainType, SearchStatus};
use shared::request::AccountDetailRequest;
use shared::response::AccountDetailResponse;
use shared::util::{ACCOUNT_SUFFIX, account_char_len, account_id, now_secs};

use super::{OrderService, normalize_account};
use crate::error::ServiceResult;
use crate::pricing::PriceSnapshot;

/// Status of an existing account at `now` (unix seconds), plus the
/// re-register time while it awaits recycling
pub(super) fn lifecycle_status(info: &AccountInfo, snapshot: &PriceSnapshot, now: i64) -> (SearchStatus, i64) {
    let auction_start = info.expired_at + snapshot.grace_period_secs;
    let recycle_start = auction_start + snapshot.auction_period_secs;
    if now >= recycle_start {
        (
            SearchStatus::AuctionRecycling,
            recycle_start + snapshot.delivery_period_secs,
        )
    } else if now >= auction_start {
        (SearchStatus::OnDutchAuction, 0)
    } else {
        let status = info
            .account_status()
            .map_or(SearchStatus::Registered, SearchStatus::from_account_status);
        (status, 0)
    }
}

impl OrderService {
    pub async fn account_detail(&self, req: &AccountDetailRequest) -> ServiceResult<AccountDetailResponse> {
        let account = normalize_account(&req.account)?;

        let Some(info) = self.store.account_info(&account_id(&account)).await? else {
            let status = if self.policy.is_reserved(&account) {
                SearchStatus::Reserved
            } else if self.policy.is_unavailable(&account) {
                SearchStatus::Unavailable
            } else {
                return Err(AppError::new(ErrorCode::AccountNotFound).into());
            };
            return Ok(AccountDetailResponse {
                account,
                status,
                owner: None,
                owner_chain_type: None,
                manager: None,
                manager_chain_type: None,
                registered_at: 0,
                expired_at: 0,
                re_register_time: 0,
                base_amount: Decimal::ZERO,
                account_price: Decimal::ZERO,
            });
        };

        let snapshot = self.pricing.config().snapshot();
        let (status, re_register_time) = lifecycle_status(&info, &snapshot, now_secs());

        let algorithm_id = u8::try_from(info.owner_algorithm_id).unwrap_or_default();
        let name = account.strip_suffix(ACCOUNT_SUFFIX).unwrap_or(&account);
        let (base_amount, account_price) = self
            .pricing
            .renewal_quote(account_char_len(&account), name.len(), algorithm_id)
            .await?;

        let owner_chain_type = ChainType::from_db(info.owner_chain_type);
        let manager_chain_type = ChainType::from_db(info.manager_chain_type);
        let owner = self
            .display_address(owner_chain_type, &info.owner, info.owner_algorithm_id)
            .await?;
        let manager = self
            .display_address(manager_chain_type, &info.manager, info.manager_algorithm_id)
            .await?;

        Ok(AccountDetailResponse {
            account,
            status,
            owner: Some(owner),
            owner_chain_type,
            manager: Some(manager),
            manager_chain_type,
            registered_at: info.registered_at,
            expired_at: info.expired_at,
            re_register_time,
            base_amount,
            account_price,
        })
    }

    async fn display_address(
        &self,
        chain: Option<ChainType>,
        address_hex: &str,
        algorithm_id: i16,
    ) -> ServiceResult<String> {
        match chain {
            Some(chain) => Ok(self
                .chain
                .codec
                .hex_to_normal(chain, address_hex, u8::try_from(algorithm_id).unwrap_or_default())
                .await?),
            None => Ok(address_hex.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    const DAY: i64 = 86_400;

    fn snapshot() -> PriceSnapshot {
        PriceSnapshot {
            prices: BTreeMap::new(),
            inviter_discount: 0,
            default_basic_capacity: 0,
            basic_capacity_by_algorithm: HashMap::new(),
            prepared_fee: 0,
            premium: Decimal::ZERO,
            discount: Decimal::ZERO,
            max_register_years: 20,
            maintenance: false,
            grace_period_secs: 90 * DAY,
            auction_period_secs: 27 * DAY,
            delivery_period_secs: 3 * DAY,
        }
    }

    fn info(status: i16, expired_at: i64) -> AccountInfo {
        AccountInfo {
            account_id: "0x01".into(),
            account: "alice.bit".into(),
            owner: "0xabc".into(),
            owner_chain_type: 1,
            owner_algorithm_id: 5,
            manager: "0xabc".into(),
            manager_chain_type: 1,
            manager_algorithm_id: 5,
            status,
            registered_at: 0,
            expired_at,
        }
    }

    #[test]
    fn live_accounts_report_chain_status() {
        let snap = snapshot();
        let expired_at = 1_000 * DAY;
        assert_eq!(
            lifecycle_status(&info(0, expired_at), &snap, expired_at - 1),
            (SearchStatus::Registered, 0)
        );
        assert_eq!(
            lifecycle_status(&info(1, expired_at), &snap, expired_at - 1),
            (SearchStatus::OnSale, 0)
        );
        // inside grace the account still belongs to its owner
        assert_eq!(
            lifecycle_status(&info(0, expired_at), &snap, expired_at + 89 * DAY),
            (SearchStatus::Registered, 0)
        );
    }

    #[test]
    fn expired_accounts_walk_auction_then_recycling() {
        let snap = snapshot();
        let expired_at = 1_000 * DAY;
        let auction_start = expired_at + 90 * DAY;
        let recycle_start = auction_start + 27 * DAY;

        assert_eq!(
            lifecycle_status(&info(0, expired_at), &snap, auction_start),
            (SearchStatus::OnDutchAuction, 0)
        );
        assert_eq!(
            lifecycle_status(&info(0, expired_at), &snap, recycle_start - 1),
            (SearchStatus::OnDutchAuction, 0)
        );
        assert_eq!(
            lifecycle_status(&info(0, expired_at), &snap, recycle_start),
            (SearchStatus::AuctionRecycling, recycle_start + 3 * DAY)
        );
    }
}
