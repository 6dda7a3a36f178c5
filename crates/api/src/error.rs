//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::TransferError;

/// API-level error type that maps to HTTP responses.
///
/// Every response body carries a stable `code` plus a human-readable
/// `error`; server-side failures never leak internal detail.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Transfer execution error.
    Transfer(TransferError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, settlement_code) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Transfer(err) => transfer_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = serde_json::json!({ "code": code, "error": message });
        if let Some(settlement_code) = settlement_code {
            body["settlement_code"] = serde_json::Value::String(settlement_code.to_string());
        }
        (status, axum::Json(body)).into_response()
    }
}

fn transfer_error_to_response(
    err: TransferError,
) -> (StatusCode, &'static str, String, Option<&'static str>) {
    let code = err.code();
    match &err {
        TransferError::OriginNotFound(_) | TransferError::DestinationNotFound(_) => {
            (StatusCode::NOT_FOUND, code, err.to_string(), None)
        }
        TransferError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, code, err.to_string(), None),
        TransferError::InsufficientFunds { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, code, err.to_string(), None)
        }
        TransferError::ExternalRejected {
            code: settlement,
            message,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            code,
            message.clone(),
            Some(settlement.as_str()),
        ),
        // Server-side failures: log the detail, answer generically
        TransferError::Ledger(_)
        | TransferError::CreditFailed { .. }
        | TransferError::Persistence { .. }
        | TransferError::Internal(_) => {
            tracing::error!(error = %err, "transfer failed server-side");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "transfer could not be completed".to_string(),
                None,
            )
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        ApiError::Transfer(err)
    }
}
