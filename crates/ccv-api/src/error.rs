//! # API Error Types
//!
//! Maps [`CircleError`] and [`LedgerError`] to HTTP status codes and a
//! uniform JSON body:
//!
//! ```json
//! {"error": {"code": "DUPLICATE_PAYMENT", "message": "...", "details": {...}}}
//! ```
//!
//! `details` carries the circle, round, and member the error concerns, plus
//! the unpaid members for outstanding and overdue rounds. Internal errors
//! are logged and reported without detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ccv_ledger::LedgerError;
use ccv_settlement::{CircleError, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "PAYMENT_OVERDUE").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A circle operation was rejected.
    #[error(transparent)]
    Circle(#[from] CircleError),

    /// The ledger failed or refused a request.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Circle(err) => {
                let status = match (err, err.kind()) {
                    (CircleError::NotFound { .. }, _) => StatusCode::NOT_FOUND,
                    (_, ErrorKind::Input) => StatusCode::UNPROCESSABLE_ENTITY,
                    (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
                    (_, ErrorKind::Precondition | ErrorKind::StaleState | ErrorKind::Recoverable) => {
                        StatusCode::CONFLICT
                    }
                };
                (status, err.code())
            }
            Self::Ledger(LedgerError::NotFound { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Ledger(_) => (StatusCode::BAD_GATEWAY, "LEDGER_ERROR"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let Self::Circle(err) = self else {
            return None;
        };
        if err.kind() == ErrorKind::Internal {
            return None;
        }
        let mut details = serde_json::Map::new();
        if let Some(id) = err.circle_id() {
            details.insert("circle_id".into(), serde_json::json!(id.as_uuid()));
        }
        if let Some(round) = err.round_index() {
            details.insert("round_index".into(), serde_json::json!(round));
        }
        if let Some(member) = err.member_id() {
            details.insert("member_id".into(), serde_json::json!(member));
        }
        if let Some(unpaid) = err.unpaid() {
            details.insert("unpaid".into(), serde_json::json!(unpaid));
        }
        if let CircleError::PaymentOverdue { deadline, .. } = err {
            details.insert("deadline".into(), serde_json::json!(deadline));
        }
        (!details.is_empty()).then_some(serde_json::Value::Object(details))
    }

    fn is_internal(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Circle(err) => err.kind() == ErrorKind::Internal,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            if status == StatusCode::BAD_GATEWAY {
                tracing::warn!(error = %self, "ledger request failed");
            }
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ccv_core::ValidationError> for AppError {
    fn from(err: ccv_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
