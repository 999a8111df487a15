//! POST /v1/coupon/check

use axum::Json;
use axum::extract::State;
use shared::error::ApiResponse;
use shared::request::CouponCheckRequest;
use shared::response::CouponCheckResponse;

use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn check_coupon(
    State(state): State<AppState>,
    Json(req): Json<CouponCheckRequest>,
) -> ServiceResult<ApiResponse<CouponCheckResponse>> {
    let resp = state.orders.check_coupon(&req).await?;
    Ok(ApiResponse::success(resp))
}
