//! The matching pipeline: a fixed sequence of stages over one
//! [`PipelineState`], with a feedback loop back to intent resolution.

pub mod feedback;
pub mod orchestrator;
pub mod state;
pub mod suggestions;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    Project,
    matching::{ranking::ScoredCandidate, scoring::ProjectScore},
};

pub use feedback::{Feedback, FeedbackDecision, FeedbackHandler};
pub use orchestrator::{Collaborators, MatchingPipeline};
pub use state::{PipelineState, Stage};

/// Explanation key for the narrator's overall summary.
pub const GENERAL_EXPLANATION_KEY: &str = "general";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchInput {
    pub user_id: String,
    pub query: String,
    pub context: Option<Value>,
    pub feedback: Option<Feedback>,
    pub previous_matches: Vec<String>,
}

impl MatchInput {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub run_id: String,
    /// Best first, at most `max_matches`.
    pub matches: Vec<ScoredCandidate>,
    /// Per-project explanations plus the `general` summary.
    pub explanations: BTreeMap<String, String>,
    pub suggestions: Vec<String>,
    /// `(project id, score)` of the leading matches, best first.
    pub score_summary: Vec<(String, f64)>,
    pub iterations: u32,
    pub iteration_limit_reached: bool,
}

/// Score and explanation of a single project for a single user.
#[derive(Debug, Clone)]
pub struct ProjectExplanation {
    pub project: Project,
    pub score: ProjectScore,
    pub explanation: String,
}
