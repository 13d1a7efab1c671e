use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to an external collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("service disabled: {0}")]
    Disabled(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Transport(_) => "transport",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Malformed(_) => "malformed",
            ServiceError::Disabled(_) => "disabled",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ServiceError::Malformed(value.to_string())
        } else if value.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            ServiceError::NotFound(value.to_string())
        } else {
            ServiceError::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        ServiceError::Malformed(value.to_string())
    }
}

/// Errors that abort a pipeline run or a single-project explanation. Every
/// other collaborator failure is absorbed by the stage that made the call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("profile not found for user {0}")]
    ProfileNotFound(String),
    #[error("profile for user {user_id} could not be loaded: {source}")]
    ProfileUnavailable {
        user_id: String,
        #[source]
        source: ServiceError,
    },
    #[error("project catalog could not be reached: {0}")]
    CatalogUnavailable(#[source] ServiceError),
}

impl PipelineError {
    pub fn from_profile_error(user_id: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => PipelineError::ProfileNotFound(user_id.to_string()),
            other => PipelineError::ProfileUnavailable {
                user_id: user_id.to_string(),
                source: other,
            },
        }
    }
}
