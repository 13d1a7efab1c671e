use std::collections::BTreeMap;

use serde_json::Value;
use strum::{AsRefStr, IntoStaticStr};

use super::{MatchInput, feedback::Feedback};
use crate::{
    HistoryEntry, Project, UserProfile, matching::ranking::ScoredCandidate,
    retrieval::ResolvedIntent, run_id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    AnalyzeProfile,
    ResolveIntent,
    Retrieve,
    Score,
    Rerank,
    Explain,
    FeedbackCheck,
    Done,
}

impl Stage {
    /// Successor of this stage. `FeedbackCheck` loops back to
    /// `ResolveIntent` when a refinement was requested.
    pub fn next(self, refinement_needed: bool) -> Stage {
        match self {
            Stage::AnalyzeProfile => Stage::ResolveIntent,
            Stage::ResolveIntent => Stage::Retrieve,
            Stage::Retrieve => Stage::Score,
            Stage::Score => Stage::Rerank,
            Stage::Rerank => Stage::Explain,
            Stage::Explain => Stage::FeedbackCheck,
            Stage::FeedbackCheck if refinement_needed => Stage::ResolveIntent,
            Stage::FeedbackCheck | Stage::Done => Stage::Done,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Working state of one pipeline run. Owned by that run alone.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub run_id: String,
    pub stage: Stage,
    pub user_id: String,
    pub query: String,
    pub context: Option<Value>,
    pub profile: UserProfile,
    pub history: Vec<HistoryEntry>,
    pub intent: ResolvedIntent,
    pub candidates: Vec<Project>,
    pub matches: Vec<ScoredCandidate>,
    pub explanations: BTreeMap<String, String>,
    /// Pending feedback, taken by the feedback check.
    pub feedback: Option<Feedback>,
    /// Feedback that triggered the current refinement round.
    pub applied_feedback: Option<Feedback>,
    pub previous_matches: Vec<String>,
    pub refinement_needed: bool,
    pub iteration_count: u32,
    pub iteration_limit_reached: bool,
}

impl PipelineState {
    pub fn new(input: MatchInput) -> Self {
        Self {
            run_id: run_id::generate(),
            stage: Stage::AnalyzeProfile,
            user_id: input.user_id,
            query: input.query,
            context: input.context,
            profile: UserProfile::default(),
            history: Vec::new(),
            intent: ResolvedIntent::default(),
            candidates: Vec::new(),
            matches: Vec::new(),
            explanations: BTreeMap::new(),
            feedback: input.feedback,
            applied_feedback: None,
            previous_matches: input.previous_matches,
            refinement_needed: false,
            iteration_count: 0,
            iteration_limit_reached: false,
        }
    }

    pub fn match_ids(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.id().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = Stage::AnalyzeProfile;
        let mut visited = vec![stage];
        while stage != Stage::Done {
            stage = stage.next(false);
            visited.push(stage);
        }

        assert_eq!(
            visited,
            vec![
                Stage::AnalyzeProfile,
                Stage::ResolveIntent,
                Stage::Retrieve,
                Stage::Score,
                Stage::Rerank,
                Stage::Explain,
                Stage::FeedbackCheck,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn feedback_check_loops_back_on_refinement() {
        assert_eq!(Stage::FeedbackCheck.next(true), Stage::ResolveIntent);
        assert_eq!(Stage::Done.next(true), Stage::Done);
        assert_eq!(Stage::Score.next(true), Stage::Rerank);
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(Stage::ResolveIntent.name(), "resolve_intent");
        assert_eq!(Stage::FeedbackCheck.as_ref(), "feedback_check");
    }

    #[test]
    fn new_state_starts_clean() {
        let state = PipelineState::new(MatchInput::new("u-7", "reforestación"));

        assert_eq!(state.stage, Stage::AnalyzeProfile);
        assert_eq!(state.user_id, "u-7");
        assert_eq!(state.run_id.len(), 26);
        assert_eq!(state.iteration_count, 0);
        assert!(state.matches.is_empty());
    }
}
