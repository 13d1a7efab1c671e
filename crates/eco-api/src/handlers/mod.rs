pub mod health;
pub mod matches;
pub mod similar;

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::ApiError;

/// Unwraps a JSON body, turning extractor rejections into `400`s with the
/// usual error body.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}
