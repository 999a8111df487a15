//! register-server: order, payment and transaction-assembly engine for
//! `.bit` account registration
//!
//! - Prices registrations in USD, CKB and the chosen pay token
//! - Creates orders under request locks, with optional gift-card redemption
//! - Builds balance payments from reserved funding cells and parks them in
//!   the sign cache
//! - Broadcasts signed transactions and records them for confirmation tracking

pub mod api;
pub mod broadcast;
pub mod chain;
pub mod config;
pub mod coupon;
pub mod db;
pub mod error;
pub mod funding;
pub mod guard;
pub mod kv;
pub mod logger;
pub mod orders;
pub mod payment;
pub mod pricing;
pub mod sign_cache;
pub mod state;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::{AppState, Backends};
