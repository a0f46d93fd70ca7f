//! # Request Extraction & Validation
//!
//! Request DTOs implement [`Validate`] for rules serde cannot express;
//! [`extract_validated_json`] maps parse failures to 400 and rule
//! violations to 422.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use ccv_core::MemberId;

use crate::error::AppError;

/// Business-rule validation beyond deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse a member id from a path or body field.
pub fn parse_member_id(raw: &str) -> Result<MemberId, AppError> {
    MemberId::new(raw).map_err(AppError::from)
}
