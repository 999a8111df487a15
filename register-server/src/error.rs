//! Unified service-layer error type for the register server
//!
//! `ServiceError` bridges infrastructure errors (`sqlx::Error`, KV and ledger
//! transport) and the API-layer error (`AppError`), so services can use `?`
//! without hand-written `map_err` + logging at every call site.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::chain::ChainError;
use crate::kv::KvError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db` / `Cache` / `Upstream`: infrastructure errors (logged with their
///   origin, surfaced as `InternalError`)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    /// Order store
    Db(BoxError),
    /// Shared key-value store
    Cache(BoxError),
    /// Ledger node, indexer or SDK sidecar
    Upstream(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(e) => write!(f, "database: {e}"),
            Self::Cache(e) => write!(f, "cache: {e}"),
            Self::Upstream(e) => write!(f, "upstream: {e}"),
            Self::App(e) => write!(f, "{e}"),
        }
    }
}

impl ServiceError {
    /// Error code the client will see
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::App(e) => e.code,
            _ => ErrorCode::InternalError,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<KvError> for ServiceError {
    fn from(e: KvError) -> Self {
        ServiceError::Cache(e.into())
    }
}

impl From<ChainError> for ServiceError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::AddressFormat(msg) => ServiceError::App(AppError::address_format(msg)),
            other => ServiceError::Upstream(other.into()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(err) => {
                tracing::error!(error = %err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
            ServiceError::Cache(err) => {
                tracing::error!(error = %err, "Service cache error");
                AppError::new(ErrorCode::InternalError)
            }
            ServiceError::Upstream(err) => {
                tracing::error!(error = %err, "Service upstream error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
