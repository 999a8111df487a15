use shared::models::AccountInfo;
use sqlx::PgPool;

pub async fn find_by_account_id(
    pool: &PgPool,
    account_id: &str,
) -> Result<Option<AccountInfo>, sqlx::Error> {
    sqlx::query_as(
        "SELECT account_id, account, owner, owner_chain_type, owner_algorithm_id,
                manager, manager_chain_type, manager_algorithm_id, status,
                registered_at, expired_at
         FROM account_info WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await
}
