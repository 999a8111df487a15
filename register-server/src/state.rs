//! Application state for the register server

use std::sync::Arc;

use crate::broadcast::TxSender;
use crate::chain::ChainClients;
use crate::chain::rpc::JsonRpcChain;
use crate::config::Config;
use crate::coupon::CouponLedger;
use crate::db::{MemoryStore, PgStore, Store};
use crate::error::BoxError;
use crate::funding::{CellInventory, CellReservations};
use crate::guard::{DistributedLock, RateGuard};
use crate::kv::{KvStore, MemoryKv, RedisKv};
use crate::orders::{OrderPolicy, OrderService};
use crate::payment::PaymentService;
use crate::pricing::{PriceConfigHandle, PricingEngine};
use crate::sign_cache::SignCache;

/// External collaborators the services are built on
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn Store>,
    pub kv: Arc<dyn KvStore>,
    pub chain: ChainClients,
    pub prices: PriceConfigHandle,
    /// Set when running on the in-process KV backend
    pub memory_kv: Option<Arc<MemoryKv>>,
}

impl Backends {
    /// Connect PostgreSQL, Redis and the ledger RPC endpoints described by `config`
    pub async fn connect(config: &Config, prices: PriceConfigHandle) -> Result<Self, BoxError> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await?),
            None => {
                tracing::warn!("DATABASE_URL not set, orders are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let (kv, memory_kv): (Arc<dyn KvStore>, _) = match &config.redis_url {
            Some(url) => {
                let redis = RedisKv::connect(url).await?;
                redis.health_check().await?;
                (Arc::new(redis), None)
            }
            None => {
                tracing::warn!("REDIS_URL not set, locks and sign cache are local to this process");
                let memory = Arc::new(MemoryKv::new());
                (memory.clone(), Some(memory))
            }
        };

        let rpc = Arc::new(JsonRpcChain::new(
            config.ckb_rpc_url.clone(),
            config.indexer_url.clone(),
            config.sdk_rpc_url.clone(),
        ));

        Ok(Self {
            store,
            kv,
            chain: ChainClients::from_rpc(rpc),
            prices,
            memory_kv,
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub payments: PaymentService,
    pub sender: TxSender,
    pub prices: PriceConfigHandle,
    pub reservations: Arc<CellReservations>,
    memory_kv: Option<Arc<MemoryKv>>,
}

impl AppState {
    pub fn new(backends: Backends, config: &Config) -> Self {
        let Backends {
            store,
            kv,
            chain,
            prices,
            memory_kv,
        } = backends;

        let reservations = Arc::new(CellReservations::new());
        let inventory = CellInventory::new(chain.indexer.clone(), reservations.clone());
        let guard = RateGuard::new(kv.clone(), store.clone(), config.guard.clone());
        let cache = SignCache::new(kv.clone(), config.sign_cache_ttl);
        let coupons = CouponLedger::new(
            store.clone(),
            DistributedLock::new(kv),
            config.coupon_salt.clone(),
        );
        let pricing = PricingEngine::new(prices.clone(), chain.quotes.clone());

        let orders = OrderService::new(
            chain.clone(),
            store.clone(),
            guard.clone(),
            coupons,
            pricing,
            inventory.clone(),
            config.funding.clone(),
            OrderPolicy::from_config(config),
        );
        let payments = PaymentService::new(
            chain.clone(),
            store.clone(),
            inventory.clone(),
            cache.clone(),
            guard.clone(),
            prices.clone(),
            config.funding.clone(),
            config.balance_pay_address.clone(),
        );
        let sender = TxSender::new(chain, cache, inventory, guard, store, config.funding.clone());

        Self {
            orders,
            payments,
            sender,
            prices,
            reservations,
            memory_kv,
        }
    }

    /// Drop expired cell reservations and in-process KV entries
    pub fn cleanup(&self) {
        let released = self.reservations.cleanup();
        if released > 0 {
            tracing::debug!(released, "expired cell reservations dropped");
        }
        if let Some(kv) = &self.memory_kv {
            kv.cleanup();
        }
    }
}
