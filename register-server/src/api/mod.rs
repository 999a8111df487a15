//! HTTP API for the register server
//!
//! | Path | Method | Handler |
//! |------|--------|---------|
//! | /health | GET | [`health::health_check`] |
//! | /v1/coupon/check | POST | [`coupon::check_coupon`] |
//! | /v1/account/order/register | POST | [`order::register`] |
//! | /v1/account/detail | POST | [`account::detail`] |
//! | /v1/balance/pay | POST | [`transaction::balance_pay`] |
//! | /v1/transaction/send | POST | [`transaction::send`] |

pub mod account;
pub mod coupon;
pub mod health;
pub mod order;
pub mod transaction;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Routes without middleware or state
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/coupon/check", post(coupon::check_coupon))
        .route("/v1/account/order/register", post(order::register))
        .route("/v1/account/detail", post(account::detail))
        .route("/v1/balance/pay", post(transaction::balance_pay))
        .route("/v1/transaction/send", post(transaction::send))
}

/// Fully configured application
pub fn create_router(state: AppState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
