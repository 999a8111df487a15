//! Two-phase transaction endpoints
//!
//! POST /v1/balance/pay: build, reserve cells, return sign key and messages
//! POST /v1/transaction/send: attach signatures, broadcast, settle

use axum::Json;
use axum::extract::State;
use shared::error::ApiResponse;
use shared::request::{BalancePayRequest, TransactionSendRequest};
use shared::response::{SignInfo, TransactionSendResponse};

use crate::error::ServiceResult;
use crate::state::AppState;

pub async fn balance_pay(
    State(state): State<AppState>,
    Json(req): Json<BalancePayRequest>,
) -> ServiceResult<ApiResponse<SignInfo>> {
    let info = state.payments.build_balance_payment(&req).await?;
    Ok(ApiResponse::success(info))
}

pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<TransactionSendRequest>,
) -> ServiceResult<ApiResponse<TransactionSendResponse>> {
    let hash = state.sender.send(&req).await?;
    Ok(ApiResponse::success(TransactionSendResponse { hash }))
}
