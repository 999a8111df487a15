//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.prices.snapshot();
    Json(serde_json::json!({
        "status": if snapshot.maintenance { "maintenance" } else { "ok" },
        "service": "register-server",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
        "reserved_cells": state.reservations.held_count(),
    }))
}
