//! Shared types for the registration service
//!
//! Common types used by the register server and its clients: the unified
//! error system, domain models, API request/response bodies and small
//! utilities.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
