// register-server/tests/order_flow.rs
// Order creation, gift cards and account lookups over in-process backends

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::error::ErrorCode;
use shared::models::{
    ChainType, CouponType, NULL_OWNER, Order, OrderStatus, OrderType, PayTokenId, RegisterStatus,
    SearchStatus, TxAction, TxStatus,
};
use shared::request::{AccountDetailRequest, CouponCheckRequest};
use shared::util::{account_id, now_secs};

use common::{ETH_RECEIPT, Harness, register_request, test_config};
use register_server::orders::OrderNotifier;

const ALICE: &str = "0xa11ce00000000000000000000000000000000001";
const BOB: &str = "0xb0b0000000000000000000000000000000000002";

fn code_of<T: std::fmt::Debug>(result: Result<T, register_server::ServiceError>) -> ErrorCode {
    result.expect_err("expected an error").code()
}

#[tokio::test]
async fn four_char_coupon_funds_the_order() {
    let h = Harness::new();
    h.add_coupon("GIFT-4", CouponType::FourChar);

    let mut req = register_request("abcd.bit", ALICE, PayTokenId::COUPON);
    req.gift_card = Some("GIFT-4".into());
    let resp = h.state.orders.create_order(&req).await.unwrap();

    assert_eq!(resp.amount, Decimal::ZERO);
    assert!(resp.receipt_address.is_none());

    let orders = h.store.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.order_id, resp.order_id);
    assert_eq!(order.pay_status, TxStatus::Sending);
    let content = order.parsed_content().unwrap();
    assert_eq!(content.amount_total_usd, Decimal::ZERO);
    assert_eq!(content.amount_total_ckb, Decimal::ZERO);

    let coupon = h.store.coupon(&h.coupon_digest("GIFT-4")).unwrap();
    assert_eq!(coupon.order_id, resp.order_id);
}

#[tokio::test]
async fn coupon_redeems_once_under_concurrency() {
    let h = Harness::new();
    h.add_coupon("RACE", CouponType::FourChar);

    let mut first = register_request("abcd.bit", ALICE, PayTokenId::COUPON);
    first.gift_card = Some("RACE".into());
    let mut second = register_request("wxyz.bit", BOB, PayTokenId::COUPON);
    second.gift_card = Some("RACE".into());

    let (a, b) = tokio::join!(
        h.state.orders.create_order(&first),
        h.state.orders.create_order(&second)
    );

    let results = [a, b];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for r in &results {
        if let Err(e) = r {
            assert!(
                matches!(
                    e.code(),
                    ErrorCode::OperationTooFrequent | ErrorCode::CouponAlreadyUsed
                ),
                "unexpected {:?}",
                e.code()
            );
        }
    }
    assert_eq!(h.store.orders().len(), 1);
}

#[tokio::test]
async fn coupon_lock_released_after_failure() {
    let h = Harness::new();
    h.add_coupon("TIER", CouponType::FourChar);

    let mut wrong_tier = register_request("abcde.bit", ALICE, PayTokenId::COUPON);
    wrong_tier.gift_card = Some("TIER".into());
    assert_eq!(
        code_of(h.state.orders.create_order(&wrong_tier).await),
        ErrorCode::CouponTypeMismatch
    );

    // The lock TTL is a minute; success here means the failed attempt unlocked
    let mut ok = register_request("abcd.bit", ALICE, PayTokenId::COUPON);
    ok.gift_card = Some("TIER".into());
    h.state.orders.create_order(&ok).await.unwrap();

    let mut reuse = register_request("wxyz.bit", BOB, PayTokenId::COUPON);
    reuse.gift_card = Some("TIER".into());
    assert_eq!(
        code_of(h.state.orders.create_order(&reuse).await),
        ErrorCode::CouponAlreadyUsed
    );
}

#[tokio::test]
async fn coupon_amounts_must_be_consistent() {
    let h = Harness::new();
    h.add_coupon("PAID", CouponType::FourChar);

    // gift card with a priced token
    let mut priced = register_request("abcd.bit", ALICE, PayTokenId::ETH);
    priced.gift_card = Some("PAID".into());
    assert_eq!(
        code_of(h.state.orders.create_order(&priced).await),
        ErrorCode::OrderAmountInconsistent
    );
    assert!(!h.store.coupon(&h.coupon_digest("PAID")).unwrap().is_bound());

    // free token without a gift card
    let free = register_request("wxyz.bit", BOB, PayTokenId::COUPON);
    assert_eq!(
        code_of(h.state.orders.create_order(&free).await),
        ErrorCode::OrderAmountInconsistent
    );
    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn gift_cards_are_single_year() {
    let h = Harness::new();
    h.add_coupon("YEARS", CouponType::FivePlus);

    let mut req = register_request("abcdef.bit", ALICE, PayTokenId::COUPON);
    req.gift_card = Some("YEARS".into());
    req.register_years = 2;
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::InvalidRequest
    );
}

#[tokio::test]
async fn paid_order_waits_for_payment() {
    let h = Harness::new();

    let resp = h
        .state
        .orders
        .create_order(&register_request("abcdef.bit", ALICE, PayTokenId::ETH))
        .await
        .unwrap();

    assert_eq!(resp.receipt_address.as_deref(), Some(ETH_RECEIPT));
    assert!(resp.amount > Decimal::ZERO);
    assert_eq!(resp.amount % dec!(1000000), Decimal::ZERO);

    let order: Order = h.store.orders().remove(0);
    assert_eq!(order.order_type, OrderType::Own);
    assert_eq!(order.action, TxAction::ApplyRegister);
    assert_eq!(order.pay_status, TxStatus::Default);
    assert_eq!(order.order_status, OrderStatus::Default);
    assert_eq!(order.register_status, RegisterStatus::ConfirmPayment);
    assert_eq!(order.account_id, account_id("abcdef.bit"));
    assert_eq!(order.address, ALICE);

    let content = order.parsed_content().unwrap();
    assert_eq!(content.account_char_str, "abcdef");
    // $5 for one year plus (206 + 6 + 1) CKB at $0.01
    assert_eq!(content.amount_total_usd, dec!(7.13));
    assert_eq!(content.amount_total_ckb, dec!(71300000000));
}

#[tokio::test]
async fn duplicate_request_is_throttled() {
    let h = Harness::new();
    let req = register_request("abcdef.bit", ALICE, PayTokenId::ETH);

    h.state.orders.create_order(&req).await.unwrap();
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::OperationTooFrequent
    );
    assert_eq!(h.store.orders().len(), 1);
}

#[tokio::test]
async fn unpaid_order_ceiling() {
    let mut config = test_config();
    config.guard.max_unpaid_orders = 1;
    let h = Harness::with_config(config);

    for account in ["first1.bit", "second.bit"] {
        h.state
            .orders
            .create_order(&register_request(account, ALICE, PayTokenId::ETH))
            .await
            .unwrap();
    }
    assert_eq!(
        code_of(
            h.state
                .orders
                .create_order(&register_request("third3.bit", ALICE, PayTokenId::ETH))
                .await
        ),
        ErrorCode::OperationTooFrequent
    );
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let h = Harness::new();
    let base = || register_request("abcdef.bit", ALICE, PayTokenId::ETH);

    let mut req = base();
    req.register_years = 0;
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);

    let mut req = base();
    req.register_years = 21;
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);

    let mut req = base();
    req.coin_type = Some("060".into());
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);

    let mut req = base();
    req.cross_coin_type = Some("61".into());
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);

    let mut req = base();
    req.chain_type = ChainType::Ckb;
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::ChainTypeNotSupported
    );

    let mut req = base();
    req.pay_token_id = PayTokenId::from(PayTokenId::CKB_INTERNAL);
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::PayTypeInvalid);

    let mut req = base();
    req.address = "not-hex".into();
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::AddressFormatError
    );

    let mut req = base();
    req.account = "abcdef".into();
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);

    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn inviter_must_be_a_live_account() {
    let h = Harness::new();
    h.add_account("burned.bit", NULL_OWNER, 0);
    h.add_account("moving.bit", "0xowner", 3);

    let cases = [
        ("nobody.bit", ErrorCode::InviterAccountNotExist),
        ("burned.bit", ErrorCode::InviterOwnerInvalid),
        ("moving.bit", ErrorCode::AccountOnCrossChain),
    ];
    for (inviter, expected) in cases {
        let mut req = register_request(&format!("x{}", inviter), ALICE, PayTokenId::ETH);
        req.inviter_account = Some(inviter.into());
        assert_eq!(code_of(h.state.orders.create_order(&req).await), expected, "{inviter}");
    }

    let mut req = register_request("abcdef.bit", ALICE, PayTokenId::ETH);
    req.channel_account = Some("nobody.bit".into());
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn whitelisted_inviter_becomes_channel() {
    let h = Harness::new();
    h.add_account("partner.bit", "0xowner", 0);
    h.add_account("friend.bit", "0xowner", 0);

    let mut req = register_request("abcdef.bit", ALICE, PayTokenId::ETH);
    req.inviter_account = Some("partner.bit".into());
    h.state.orders.create_order(&req).await.unwrap();

    let mut req = register_request("ghijkl.bit", BOB, PayTokenId::ETH);
    req.inviter_account = Some("Friend.bit".into());
    h.state.orders.create_order(&req).await.unwrap();

    let orders = h.store.orders();
    let content_of = |account: &str| {
        orders
            .iter()
            .find(|o| o.account == account)
            .unwrap()
            .parsed_content()
            .unwrap()
    };
    let partner = content_of("abcdef.bit");
    assert_eq!(partner.inviter_account, "partner.bit");
    assert_eq!(partner.channel_account, "partner.bit");
    // 10% off the yearly price only: $4.50 + $2.13
    assert_eq!(partner.amount_total_usd, dec!(6.63));

    let friend = content_of("ghijkl.bit");
    assert_eq!(friend.inviter_account, "friend.bit");
    assert!(friend.channel_account.is_empty());
}

#[tokio::test]
async fn unavailable_names_are_rejected() {
    let h = Harness::new();
    h.add_account("taken1.bit", "0xowner", 0);

    let cases = [
        ("taken1.bit", ErrorCode::AccountAlreadyRegistered),
        ("google.bit", ErrorCode::AccountReserved),
        ("admin.bit", ErrorCode::AccountUnavailable),
    ];
    for (account, expected) in cases {
        let req = register_request(account, ALICE, PayTokenId::ETH);
        assert_eq!(code_of(h.state.orders.create_order(&req).await), expected, "{account}");
    }
}

#[tokio::test]
async fn paid_order_blocks_other_registrations() {
    let h = Harness::new();
    let resp = h
        .state
        .orders
        .create_order(&register_request("abcdef.bit", ALICE, PayTokenId::ETH))
        .await
        .unwrap();

    // payment lands for alice's order
    let mut order = h.store.orders().remove(0);
    assert_eq!(order.order_id, resp.order_id);
    order.pay_status = TxStatus::Ok;
    h.store.insert_order(order);

    let req = register_request("abcdef.bit", BOB, PayTokenId::ETH);
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::AccountRegistering
    );
}

#[tokio::test]
async fn receipt_address_required_for_token_chain() {
    let mut config = test_config();
    config.pay_addresses.remove("eth");
    let h = Harness::with_config(config);

    let req = register_request("abcdef.bit", ALICE, PayTokenId::ETH);
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::UnsupportedToken);

    let req = register_request("ghijkl.bit", ALICE, "sol_sol");
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::UnsupportedToken);
    assert!(h.store.orders().is_empty());
}

#[tokio::test]
async fn balance_order_needs_funds() {
    let h = Harness::new();
    let req = register_request("abcdef.bit", ALICE, PayTokenId::CKB_DAS);
    assert_eq!(
        code_of(h.state.orders.create_order(&req).await),
        ErrorCode::InsufficientBalance
    );
    assert!(h.store.orders().is_empty());

    h.chain.set_cells(ALICE, &[1_000]);
    let req = register_request("ghijkl.bit", ALICE, PayTokenId::CKB_DAS);
    let resp = h.state.orders.create_order(&req).await.unwrap();
    assert_eq!(resp.amount, dec!(71300000000));
    // the probe reserves nothing
    assert_eq!(h.state.reservations.held_count(), 0);
}

#[tokio::test]
async fn maintenance_blocks_new_orders() {
    let h = Harness::new();
    let mut snapshot = common::price_snapshot();
    snapshot.maintenance = true;
    h.prices.reload(snapshot);

    let req = register_request("abcdef.bit", ALICE, PayTokenId::ETH);
    assert_eq!(code_of(h.state.orders.create_order(&req).await), ErrorCode::SystemUpgrade);
}

struct ChannelNotifier(tokio::sync::mpsc::UnboundedSender<String>);

#[async_trait]
impl OrderNotifier for ChannelNotifier {
    async fn order_created(&self, order: &Order) {
        let _ = self.0.send(order.order_id.clone());
    }
}

#[tokio::test]
async fn notifier_sees_created_orders() {
    let h = Harness::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let orders = h
        .state
        .orders
        .clone()
        .with_notifier(Arc::new(ChannelNotifier(tx)));

    let resp = orders
        .create_order(&register_request("abcdef.bit", ALICE, PayTokenId::ETH))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.as_deref(), Some(resp.order_id.as_str()));
}

#[tokio::test]
async fn check_coupon_reports_tier() {
    let h = Harness::new();
    h.add_coupon("FIVE", CouponType::FivePlus);

    let resp = h
        .state
        .orders
        .check_coupon(&CouponCheckRequest { code: " FIVE ".into() })
        .await
        .unwrap();
    assert_eq!(resp.coupon_type, CouponType::FivePlus);

    let missing = h
        .state
        .orders
        .check_coupon(&CouponCheckRequest { code: "NOPE".into() })
        .await;
    assert_eq!(code_of(missing), ErrorCode::CouponInvalid);
}

#[tokio::test]
async fn account_detail_lookup() {
    let h = Harness::new();
    h.add_account("alice.bit", ALICE, 0);

    let detail = h
        .state
        .orders
        .account_detail(&AccountDetailRequest { account: "Alice.bit".into() })
        .await
        .unwrap();
    assert_eq!(detail.account, "alice.bit");
    assert_eq!(detail.status, SearchStatus::Registered);
    assert_eq!(detail.owner.as_deref(), Some(ALICE));
    assert_eq!(detail.owner_chain_type, Some(ChainType::Eth));
    assert_eq!(detail.account_price, dec!(5));
    // (206 + 5 + 1) CKB at $0.01
    assert_eq!(detail.base_amount, dec!(2.12));
    // unix seconds, same unit as re_register_time
    let now = now_secs();
    assert!((now - 86_400 - 5..=now - 86_400).contains(&detail.registered_at));
    assert!((now + 365 * 86_400 - 5..=now + 365 * 86_400).contains(&detail.expired_at));
    assert_eq!(detail.re_register_time, 0);

    let reserved = h
        .state
        .orders
        .account_detail(&AccountDetailRequest { account: "google.bit".into() })
        .await
        .unwrap();
    assert_eq!(reserved.status, SearchStatus::Reserved);
    assert!(reserved.owner.is_none());

    let missing = h
        .state
        .orders
        .account_detail(&AccountDetailRequest { account: "nobody.bit".into() })
        .await;
    assert_eq!(code_of(missing), ErrorCode::AccountNotFound);
}
