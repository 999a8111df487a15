use async_trait::async_trait;
use shared::models::Order;

/// Receives newly persisted orders; delivery is best-effort
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn order_created(&self, order: &Order);
}

/// Writes one structured log line per order
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn order_created(&self, order: &Order) {
        tracing::info!(
            order_id = %order.order_id,
            account = %order.account,
            token = %order.pay_token_id,
            amount = %order.pay_amount,
            "new register order"
        );
    }
}
