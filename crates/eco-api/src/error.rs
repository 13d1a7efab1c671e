use axum::{Json, http::StatusCode, response::IntoResponse};
use eco_common::error::PipelineError;
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

tokio::task_local! {
    static REQUEST_ID: String;
}

const MAX_MESSAGE_CHARS: usize = 240;

/// Client-visible text for 400 and 404 bodies. Those messages echo request
/// input (serde rejection text, unknown project ids), so anything shaped like
/// an EcoNexo URL, a query string or a filesystem path is masked, whitespace
/// is collapsed and the result is capped at [`MAX_MESSAGE_CHARS`].
fn sanitize_message(message: &str) -> String {
    let mut cleaned = message
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|token| !token.is_empty())
        .map(redact_token)
        .collect::<Vec<_>>()
        .join(" ");

    if let Some((cut, _)) = cleaned.char_indices().nth(MAX_MESSAGE_CHARS) {
        cleaned.truncate(cut);
        cleaned.push('…');
    }

    if cleaned.is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

fn redact_token(token: &str) -> Cow<'_, str> {
    if token.contains("://") {
        return Cow::Borrowed("[redacted-url]");
    }
    match token.split_once('?') {
        Some(("", _)) => Cow::Borrowed("[redacted-query]"),
        Some((base, _)) => Cow::Owned(format!("{base}?[redacted]")),
        None if token.starts_with('/') || token.contains('\\') => Cow::Borrowed("[redacted-path]"),
        None => Cow::Borrowed(token),
    }
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    match request_id {
        Some(request_id) => REQUEST_ID.scope(request_id, fut).await,
        None => fut.await,
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("failed dependency: {0}")]
    FailedDependency(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = Json(ErrorResponse {
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::FailedDependency(_) => "failed_dependency",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => {
                Cow::Owned(sanitize_message(msg))
            }
            ApiError::FailedDependency(_) => Cow::Borrowed("upstream service unavailable"),
            ApiError::ServiceUnavailable(_) => Cow::Borrowed("service unavailable"),
            ApiError::Internal(_) => Cow::Borrowed("internal server error"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::FailedDependency(_) => StatusCode::FAILED_DEPENDENCY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(value: PipelineError) -> Self {
        match value {
            PipelineError::ProfileNotFound(user_id) => {
                ApiError::NotFound(format!("profile not found for user {user_id}"))
            }
            other @ (PipelineError::ProfileUnavailable { .. }
            | PipelineError::CatalogUnavailable(_)) => ApiError::FailedDependency(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use eco_common::error::ServiceError;
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    #[tokio::test]
    async fn includes_request_id_in_response_body_when_present() {
        let err = ApiError::Internal("boom".into());
        let response = with_request_id(Some("req-123".into()), async { err.into_response() }).await;

        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = body.collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["request_id"], "req-123");
        assert_eq!(json["message"], "internal server error");
    }

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let missing = ApiError::from(PipelineError::ProfileNotFound("u-1".into()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let unavailable = ApiError::from(PipelineError::ProfileUnavailable {
            user_id: "u-1".into(),
            source: ServiceError::Transport("reset".into()),
        });
        assert_eq!(unavailable.status_code(), StatusCode::FAILED_DEPENDENCY);
        assert_eq!(unavailable.code(), "failed_dependency");

        let catalog = ApiError::from(PipelineError::CatalogUnavailable(ServiceError::Timeout(
            std::time::Duration::from_secs(1),
        )));
        assert_eq!(catalog.status_code(), StatusCode::FAILED_DEPENDENCY);
    }

    #[test]
    fn sanitizes_urls_paths_and_length() {
        let cleaned = sanitize_message("failed GET http://internal:3000/api at /srv/app\nnow");
        assert_eq!(cleaned, "failed GET [redacted-url] at [redacted-path] now");

        let long = "é".repeat(MAX_MESSAGE_CHARS + 10);
        let cleaned = sanitize_message(&long);
        assert_eq!(cleaned.chars().count(), MAX_MESSAGE_CHARS + 1);
        assert!(cleaned.ends_with('…'));

        assert_eq!(sanitize_message("\n\t"), "unexpected error");
    }

    #[test]
    fn masks_echoed_request_input() {
        assert_eq!(
            sanitize_message("project profiles?user_id=42 not found"),
            "project profiles?[redacted] not found"
        );
        assert_eq!(sanitize_message("bad ?token=x C:\\data\\eco"), "bad [redacted-query] [redacted-path]");
    }
}
