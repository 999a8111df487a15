//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::AccountNotFound
            | Self::OrderNotFound
            | Self::CouponInvalid => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AccountAlreadyRegistered
            | Self::AccountRegistering
            | Self::AccountReserved
            | Self::AccountUnavailable
            | Self::OrderAlreadyPaid
            | Self::CouponAlreadyUsed
            | Self::RejectedOutPoint => StatusCode::CONFLICT,

            // 403 Forbidden
            Self::PermissionDenied => StatusCode::FORBIDDEN,

            // 402 Payment Required
            Self::InsufficientBalance | Self::NotEnoughChange => StatusCode::PAYMENT_REQUIRED,

            // 410 Gone
            Self::TxExpired => StatusCode::GONE,

            // 422 Unprocessable
            Self::OrderAmountInconsistent => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            Self::OperationTooFrequent | Self::LedgerBusy => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::SystemUpgrade
            | Self::TxSendFailed => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::ConfigError
            | Self::TxBuildFailed
            | Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
