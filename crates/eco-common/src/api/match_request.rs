use serde::Deserialize;
use serde_json::Value;

use crate::{UserProfile, pipeline::{Feedback, MatchInput}};

pub const DEFAULT_SIMILAR_USERS: usize = 5;

/// Body of `POST /match`.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub user_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub context: Option<Value>,
}

impl From<MatchRequest> for MatchInput {
    fn from(request: MatchRequest) -> Self {
        MatchInput {
            context: request.context,
            ..MatchInput::new(request.user_id, request.query)
        }
    }
}

/// Body of `POST /refine`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefineRequest {
    pub user_id: String,
    #[serde(default)]
    pub query: String,
    pub feedback: Feedback,
    #[serde(default)]
    pub previous_matches: Vec<String>,
}

impl From<RefineRequest> for MatchInput {
    fn from(request: RefineRequest) -> Self {
        MatchInput {
            feedback: Some(request.feedback),
            previous_matches: request.previous_matches,
            ..MatchInput::new(request.user_id, request.query)
        }
    }
}

/// Body of `POST /explain`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainRequest {
    pub user_id: String,
    pub project_id: String,
}

/// Body of `POST /api/users/similar`. Candidate profiles travel with the
/// request; nothing is looked up.
#[derive(Debug, Clone, Deserialize)]
pub struct SimilarUsersRequest {
    pub user_id: String,
    #[serde(default)]
    pub profiles: Vec<UserProfile>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SimilarUsersRequest {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SIMILAR_USERS)
    }
}
