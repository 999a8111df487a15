//! Persistence layer
//!
//! The core depends on the [`Store`] trait only. [`PgStore`] forwards to the
//! per-table free functions over sqlx; [`MemoryStore`] keeps everything
//! in-process for tests and local development.

pub mod accounts;
pub mod coupons;
mod memory;
pub mod orders;
pub mod pending;

pub use memory::MemoryStore;

use async_trait::async_trait;
use shared::error::AppError;
use shared::models::{AccountInfo, AuctionOrder, ChainType, Coupon, Order, PendingTransactionRecord};
use sqlx::PgPool;
use thiserror::Error;

use crate::error::ServiceError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    /// A row that cannot be mapped back into a domain value
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Db(e.into())
    }
}

/// Outcome of binding a coupon while inserting its order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponBinding {
    Bound,
    /// Another order already holds the coupon; nothing was written
    AlreadyUsed,
}

impl CouponBinding {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Self::Bound => Ok(()),
            Self::AlreadyUsed => Err(AppError::new(shared::error::ErrorCode::CouponAlreadyUsed)),
        }
    }
}

/// Persistence seam of the order/payment core
#[async_trait]
pub trait Store: Send + Sync {
    async fn account_info(&self, account_id: &str) -> Result<Option<AccountInfo>, StoreError>;

    /// Orders that are neither paid nor closed for (chain, address)
    async fn count_unpaid_orders(&self, chain: ChainType, address: &str)
    -> Result<i64, StoreError>;

    /// A live order for the account placed by this address is being paid or registered
    async fn self_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError>;

    /// A live, paid order for the account exists under another address
    async fn other_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError>;

    async fn order_exists(&self, order_id: &str) -> Result<bool, StoreError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    async fn create_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Insert a coupon order and bind the coupon in one transaction
    async fn create_coupon_order(
        &self,
        order: &Order,
        coupon_digest: &str,
    ) -> Result<CouponBinding, StoreError>;

    async fn coupon_by_digest(&self, digest: &str) -> Result<Option<Coupon>, StoreError>;

    async fn create_pending(&self, record: &PendingTransactionRecord) -> Result<(), StoreError>;

    async fn create_auction_order(&self, order: &AuctionOrder) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Db(e.into()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn account_info(&self, account_id: &str) -> Result<Option<AccountInfo>, StoreError> {
        Ok(accounts::find_by_account_id(&self.pool, account_id).await?)
    }

    async fn count_unpaid_orders(
        &self,
        chain: ChainType,
        address: &str,
    ) -> Result<i64, StoreError> {
        Ok(orders::count_unpaid(&self.pool, chain, address).await?)
    }

    async fn self_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError> {
        Ok(orders::self_registering(&self.pool, account_id, chain, address).await?)
    }

    async fn other_registering(
        &self,
        account_id: &str,
        chain: ChainType,
        address: &str,
    ) -> Result<bool, StoreError> {
        Ok(orders::other_registering(&self.pool, account_id, chain, address).await?)
    }

    async fn order_exists(&self, order_id: &str) -> Result<bool, StoreError> {
        Ok(orders::exists(&self.pool, order_id).await?)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        orders::find_by_id(&self.pool, order_id)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::insert(&mut *conn, order).await?)
    }

    async fn create_coupon_order(
        &self,
        order: &Order,
        coupon_digest: &str,
    ) -> Result<CouponBinding, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !coupons::bind_to_order(&mut *tx, coupon_digest, &order.order_id).await? {
            tx.rollback().await?;
            return Ok(CouponBinding::AlreadyUsed);
        }
        orders::insert(&mut *tx, order).await?;

        tx.commit().await?;
        Ok(CouponBinding::Bound)
    }

    async fn coupon_by_digest(&self, digest: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(coupons::find_by_code(&self.pool, digest).await?)
    }

    async fn create_pending(&self, record: &PendingTransactionRecord) -> Result<(), StoreError> {
        Ok(pending::insert_pending(&self.pool, record).await?)
    }

    async fn create_auction_order(&self, order: &AuctionOrder) -> Result<(), StoreError> {
        Ok(pending::insert_auction_order(&self.pool, order).await?)
    }
}
