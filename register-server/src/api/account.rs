//! POST /v1/account/detail

use axum::Json;
use axum::extract::State;
use shared::error::ApiResponse;
use shared::request::AccountDetailRequest;
use shared::response::AccountDetailResponse;

use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn detail(
    State(state): State<AppState>,
    Json(req): Json<AccountDetailRequest>,
) -> ServiceResult<ApiResponse<AccountDetailResponse>> {
    let resp = state.orders.account_detail(&req).await?;
    Ok(ApiResponse::success(resp))
}
