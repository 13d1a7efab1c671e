use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::state::PipelineState;

/// User reaction to a previous set of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub negative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Anything else the client sent, forwarded to the intent resolver as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feedback {
    pub fn negative(reason: impl Into<String>) -> Self {
        Self {
            negative: true,
            reason: Some(reason.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackDecision {
    Finish,
    Refine,
    /// Refinement was requested but the iteration budget is spent.
    LimitReached,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedbackHandler {
    max_iterations: u32,
}

impl FeedbackHandler {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Consumes pending feedback and decides whether another round runs.
    pub fn check(&self, state: &mut PipelineState) -> FeedbackDecision {
        let Some(feedback) = state.feedback.take() else {
            state.refinement_needed = false;
            return FeedbackDecision::Finish;
        };

        if !feedback.negative {
            state.refinement_needed = false;
            return FeedbackDecision::Finish;
        }

        if state.iteration_count >= self.max_iterations {
            warn!(
                iterations = state.iteration_count,
                max_iterations = self.max_iterations,
                "refinement limit reached; returning best results so far"
            );
            state.refinement_needed = false;
            state.iteration_limit_reached = true;
            return FeedbackDecision::LimitReached;
        }

        state.refinement_needed = true;
        state.iteration_count += 1;
        info!(
            iteration = state.iteration_count,
            reason = feedback.reason.as_deref().unwrap_or(""),
            "negative feedback; refining search"
        );
        state.applied_feedback = Some(feedback);
        FeedbackDecision::Refine
    }
}
