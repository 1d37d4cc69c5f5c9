//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account with the same currency already exists")]
    DuplicateAccount,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    // Server errors (5xx)
    #[error("Rate source error: {0}")]
    ExternalFetch(#[from] crate::rates::RateSourceError),

    #[error("Notification error: {0}")]
    Notify(#[from] crate::notify::NotifyError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::InvalidCurrency(code) => {
                (StatusCode::BAD_REQUEST, "invalid_currency", Some(code.clone()))
            }
            AppError::InvalidAmount(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
            }
            AppError::DuplicateAccount => {
                (StatusCode::BAD_REQUEST, "duplicate_account", None)
            }

            // 401 Unauthorized
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }
            AppError::CurrencyNotFound(code) => {
                (StatusCode::NOT_FOUND, "currency_not_found", Some(code.clone()))
            }

            // 502 Bad Gateway - the external rate source is unreachable or malformed
            AppError::ExternalFetch(e) => {
                tracing::error!("Rate source error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "rate_source_error", None)
            }

            // 500 Internal Server Error
            AppError::Notify(e) => {
                tracing::error!("Notification error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "notification_error", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
