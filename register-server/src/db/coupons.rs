use shared::models::Coupon;
use sqlx::{PgConnection, PgPool};

pub async fn find_by_code(pool: &PgPool, digest: &str) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, code, coupon_type, order_id, start_at, expired_at
         FROM coupon_info WHERE code = $1",
    )
    .bind(digest)
    .fetch_optional(pool)
    .await
}

/// Bind an unused coupon to an order. Returns `false` when it was already bound.
pub async fn bind_to_order(
    conn: &mut PgConnection,
    digest: &str,
    order_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE coupon_info SET order_id = $1 WHERE code = $2 AND order_id = ''")
        .bind(order_id)
        .bind(digest)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
