use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{
    AccountInfo, AuctionOrder, ChainType, Coupon, OrderStatus, Order, PendingTransactionRecord,
    TxStatus,
};

use super::{CouponBinding, Store, StoreError};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, AccountInfo>,
    orders: HashMap<String, Order>,
    coupons: HashMap<String, Coupon>,
    pending: Vec<PendingTransactionRecord>,
    auction_orders: Vec<AuctionOrder>,
}

/// In-process store
///
/// One mutex over all tables, so the coupon bind + order insert is atomic
/// exactly like the SQL transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: AccountInfo) {
        self.tables
            .lock()
            .accounts
            .insert(account.account_id.clone(), account);
    }

    pub fn insert_coupon(&self, coupon: Coupon) {
        self.tables.lock().coupons.insert(coupon.code.clone(), coupon);
    }

    pub fn insert_order(&self, order: Order) {
        self.tables.lock().orders.insert(order.order_id.clone(), order);
    }

    pub fn orders(&self) -> Vec<Order> {
        self.tables.lock().orders.values().cloned().collect()
    }

    pub fn coupon(&self, digest: &str) -> Option<Coupon> {
        self.tables.lock().coupons.get(digest).cloned()
    }

    pub fn pending(&self) -> Vec<PendingTransactionRecord> {
        self.tables.lock().pending.clone()
    }

    pub fn auction_orders(&self) -> Vec<AuctionOrder> {
        self.tables.lock().auction_orders.clone()
    }

    /// Make every call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn same_owner(order: &Order, chain: ChainType, address: &str) -> bool {
    order.chain_type == chain && order.address == address
}

#[async_trait]
impl Store for MemoryStore {
    async fn account_info(&self, account_id: &str) -> Result<Option<AccountInfo>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().accounts.get(account_id).cloned())
    }

    async fn count_unpaid_orders(
        &self,
        chain: ChainType,
        address: &str,
    ) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .orders
            .values()
            .filter(|o| same_owner(o, chain, address) && o.is_unpaid())
            .count() as i64)
    }

    async fn self_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.tables.lock().orders.values().any(|o| {
            o.account_id == account_id
                && same_owner(o, chain, address)
                && o.order_status == OrderStatus::Default
                && matches!(o.pay_status, TxStatus::Sending | TxStatus::Ok)
        }))
    }

    async fn other_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.tables.lock().orders.values().any(|o| {
            o.account_id == account_id
                && !same_owner(o, chain, address)
                && o.order_status == OrderStatus::Default
                && o.pay_status == TxStatus::Ok
        }))
    }

    async fn order_exists(&self, order_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.tables.lock().orders.contains_key(order_id))
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().orders.get(order_id).cloned())
    }

    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();
        if tables.orders.contains_key(&order.order_id) {
            return Err(StoreError::Corrupt(format!(
                "duplicate order id {}",
                order.order_id
            )));
        }
        tables.orders.insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn create_coupon_order(
        &self,
        order: &Order,
        coupon_digest: &str,
    ) -> Result<CouponBinding, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();
        match tables.coupons.get_mut(coupon_digest) {
            Some(coupon) if !coupon.is_bound() => {
                coupon.order_id = order.order_id.clone();
            }
            _ => return Ok(CouponBinding::AlreadyUsed),
        }
        tables.orders.insert(order.order_id.clone(), order.clone());
        Ok(CouponBinding::Bound)
    }

    async fn coupon_by_digest(&self, digest: &str) -> Result<Option<Coupon>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().coupons.get(digest).cloned())
    }

    async fn create_pending(&self, record: &PendingTransactionRecord) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();
        if !tables.pending.iter().any(|p| p.outpoint == record.outpoint) {
            tables.pending.push(record.clone());
        }
        Ok(())
    }

    async fn create_auction_order(&self, order: &AuctionOrder) -> Result<(), StoreError> {
        self.check()?;
        self.tables.lock().auction_orders.push(order.clone());
        Ok(())
    }
}
