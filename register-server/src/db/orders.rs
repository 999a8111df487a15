use rust_decimal::Decimal;
use shared::models::{
    ChainType, Order, OrderStatus, OrderType, PayTokenId, RegisterStatus, TxAction, TxStatus,
};
use sqlx::{PgConnection, PgPool};

use super::StoreError;

/// Raw `order_info` row
#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub order_id: String,
    pub order_type: String,
    pub account_id: String,
    pub account: String,
    pub action: String,
    pub chain_type: i16,
    pub address: String,
    pub timestamp: i64,
    pub pay_token_id: String,
    pub pay_type: String,
    pub pay_amount: Decimal,
    pub content: String,
    pub pay_status: String,
    pub hedge_status: String,
    pub pre_register_status: String,
    pub order_status: String,
    pub register_status: String,
    pub coin_type: String,
    pub cross_coin_type: String,
}

fn corrupt(field: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("order_info.{field} = {value}"))
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let action: TxAction = serde_json::from_value(serde_json::Value::String(row.action.clone()))
            .map_err(|_| corrupt("action", &row.action))?;
        Ok(Order {
            order_type: OrderType::from_db(&row.order_type)
                .ok_or_else(|| corrupt("order_type", &row.order_type))?,
            chain_type: ChainType::from_db(row.chain_type)
                .ok_or_else(|| corrupt("chain_type", row.chain_type))?,
            pay_status: TxStatus::from_db(&row.pay_status)
                .ok_or_else(|| corrupt("pay_status", &row.pay_status))?,
            hedge_status: TxStatus::from_db(&row.hedge_status)
                .ok_or_else(|| corrupt("hedge_status", &row.hedge_status))?,
            pre_register_status: TxStatus::from_db(&row.pre_register_status)
                .ok_or_else(|| corrupt("pre_register_status", &row.pre_register_status))?,
            order_status: OrderStatus::from_db(&row.order_status)
                .ok_or_else(|| corrupt("order_status", &row.order_status))?,
            register_status: RegisterStatus::from_db(&row.register_status)
                .ok_or_else(|| corrupt("register_status", &row.register_status))?,
            order_id: row.order_id,
            account_id: row.account_id,
            account: row.account,
            action,
            address: row.address,
            timestamp: row.timestamp,
            pay_token_id: PayTokenId(row.pay_token_id),
            pay_type: row.pay_type,
            pay_amount: row.pay_amount,
            content: row.content,
            coin_type: row.coin_type,
            cross_coin_type: row.cross_coin_type,
        })
    }
}

pub async fn insert(conn: &mut PgConnection, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO order_info (
            order_id, order_type, account_id, account, action, chain_type, address,
            timestamp, pay_token_id, pay_type, pay_amount, content,
            pay_status, hedge_status, pre_register_status, order_status, register_status,
            coin_type, cross_coin_type
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#,
    )
    .bind(&order.order_id)
    .bind(order.order_type.as_db())
    .bind(&order.account_id)
    .bind(&order.account)
    .bind(order.action.as_str())
    .bind(order.chain_type.as_db())
    .bind(&order.address)
    .bind(order.timestamp)
    .bind(order.pay_token_id.as_str())
    .bind(&order.pay_type)
    .bind(order.pay_amount)
    .bind(&order.content)
    .bind(order.pay_status.as_db())
    .bind(order.hedge_status.as_db())
    .bind(order.pre_register_status.as_db())
    .bind(order.order_status.as_db())
    .bind(order.register_status.as_db())
    .bind(&order.coin_type)
    .bind(&order.cross_coin_type)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, order_id: &str) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_info WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &PgPool, order_id: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM order_info WHERE order_id = $1)")
            .bind(order_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn count_unpaid(
    pool: &PgPool,
    chain: ChainType,
    address: &str,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM order_info
         WHERE chain_type = $1 AND address = $2
           AND pay_status = 'default' AND order_status = 'default'",
    )
    .bind(chain.as_db())
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn self_registering(
    pool: &PgPool,
    account_id: &str,
    chain: ChainType,
    address: &str,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(
            SELECT 1 FROM order_info
            WHERE account_id = $1 AND chain_type = $2 AND address = $3
              AND order_status = 'default' AND pay_status IN ('sending', 'ok')
         )",
    )
    .bind(account_id)
    .bind(chain.as_db())
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn other_registering(
    pool: &PgPool,
    account_id: &str,
    chain: ChainType,
    address: &str,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(
            SELECT 1 FROM order_info
            WHERE account_id = $1 AND NOT (chain_type = $2 AND address = $3)
              AND order_status = 'default' AND pay_status = 'ok'
         )",
    )
    .bind(account_id)
    .bind(chain.as_db())
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
