use shared::models::{AuctionOrder, PendingTransactionRecord};
use sqlx::PgPool;

pub async fn insert_pending(
    pool: &PgPool,
    record: &PendingTransactionRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pending_info (account, action, chain_type, address, capacity, outpoint, block_timestamp)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (outpoint) DO NOTHING",
    )
    .bind(&record.account)
    .bind(&record.action)
    .bind(record.chain_type)
    .bind(&record.address)
    .bind(record.capacity)
    .bind(&record.outpoint)
    .bind(record.block_timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_auction_order(pool: &PgPool, order: &AuctionOrder) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO auction_order (
            account, account_id, address, basic_price, premium_price, bid_time,
            algorithm_id, sub_algorithm_id, chain_type, outpoint
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&order.account)
    .bind(&order.account_id)
    .bind(&order.address)
    .bind(order.basic_price)
    .bind(order.premium_price)
    .bind(order.bid_time)
    .bind(order.algorithm_id)
    .bind(order.sub_algorithm_id)
    .bind(order.chain_type)
    .bind(&order.outpoint)
    .execute(pool)
    .await?;
    Ok(())
}
