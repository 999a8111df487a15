//! Data models
//!
//! Shared between the register server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod account;
pub mod chain;
pub mod coupon;
pub mod order;
pub mod pending;
pub mod token;

// Re-exports
pub use account::*;
pub use chain::*;
pub use coupon::*;
pub use order::*;
pub use pending::*;
pub use token::*;
