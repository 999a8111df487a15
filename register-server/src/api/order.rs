//! POST /v1/account/order/register

use axum::Json;
use axum::extract::State;
use shared::error::ApiResponse;
use shared::request::OrderRegisterRequest;
use shared::response::OrderRegisterResponse;

use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<OrderRegisterRequest>,
) -> ServiceResult<ApiResponse<OrderRegisterResponse>> {
    tracing::debug!(
        account = %req.account,
        chain = %req.chain_type,
        token = %req.pay_token_id,
        years = req.register_years,
        "register order request"
    );
    let resp = state.orders.create_order(&req).await?;
    Ok(ApiResponse::success(resp))
}
