use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info, instrument, warn};

use super::{
    GENERAL_EXPLANATION_KEY, MatchInput, MatchOutcome, ProjectExplanation,
    feedback::{FeedbackDecision, FeedbackHandler},
    state::{PipelineState, Stage},
    suggestions::suggestions_for,
};
use crate::{
    config::PipelineConfig,
    error::{PipelineError, ServiceError},
    matching::{
        MatchScorer,
        ranking::{ScoredCandidate, reconcile_order, select_top},
    },
    retrieval::{CandidateRetriever, ResolvedIntent},
    services::{
        CatalogService, DisabledLanguageService, IntentQuery, IntentResolver, NarratedMatch,
        NarrationRequest, Narrator, ProfileContext, RerankCandidate, RerankRequest, Reranker,
        UserDataService, bounded,
    },
};

const NARRATOR_FALLBACK: &str = "Found several projects that match your preferences!";
const NO_MATCHES_SUMMARY: &str = "No matching projects found. Try adjusting your search criteria.";
const STAGES_PER_ROUND: usize = 7;

fn record_fallback(stage: Stage) {
    metrics::counter!("eco_pipeline_fallbacks_total", "stage" => stage.name()).increment(1);
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Everything the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub user_data: Arc<dyn UserDataService>,
    pub catalog: Arc<dyn CatalogService>,
    pub intent: Arc<dyn IntentResolver>,
    pub reranker: Arc<dyn Reranker>,
    pub narrator: Arc<dyn Narrator>,
}

impl Collaborators {
    /// Data collaborators only; every language stage takes its fallback.
    pub fn without_language(
        user_data: Arc<dyn UserDataService>,
        catalog: Arc<dyn CatalogService>,
    ) -> Self {
        let language = Arc::new(DisabledLanguageService);
        Self {
            user_data,
            catalog,
            intent: language.clone(),
            reranker: language.clone(),
            narrator: language,
        }
    }
}

pub struct MatchingPipeline {
    user_data: Arc<dyn UserDataService>,
    catalog: Arc<dyn CatalogService>,
    retriever: CandidateRetriever,
    intent: Arc<dyn IntentResolver>,
    reranker: Arc<dyn Reranker>,
    narrator: Arc<dyn Narrator>,
    scorer: MatchScorer,
    feedback: FeedbackHandler,
    config: PipelineConfig,
}

impl MatchingPipeline {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            retriever: CandidateRetriever::new(collaborators.catalog.clone(), config.call_timeout),
            user_data: collaborators.user_data,
            catalog: collaborators.catalog,
            intent: collaborators.intent,
            reranker: collaborators.reranker,
            narrator: collaborators.narrator,
            scorer: MatchScorer::default(),
            feedback: FeedbackHandler::new(config.max_iterations),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the stage machine to completion.
    ///
    /// Only a profile that cannot be loaded fails the run; every other
    /// collaborator failure degrades the stage that hit it.
    #[instrument(skip_all, fields(user_id = %input.user_id))]
    pub async fn run(&self, input: MatchInput) -> Result<MatchOutcome, PipelineError> {
        let mut state = PipelineState::new(input);
        info!(run_id = %state.run_id, "pipeline run started");

        let max_steps = (self.feedback.max_iterations() as usize)
            .saturating_add(1)
            .saturating_mul(STAGES_PER_ROUND)
            .saturating_add(1);
        let mut steps = 0usize;

        while state.stage != Stage::Done {
            steps += 1;
            if steps > max_steps {
                warn!(stage = state.stage.name(), steps, "stage budget exhausted; stopping run");
                state.iteration_limit_reached = true;
                break;
            }

            debug!(stage = state.stage.name(), iteration = state.iteration_count, "entering stage");
            match state.stage {
                Stage::AnalyzeProfile => self.analyze_profile(&mut state).await?,
                Stage::ResolveIntent => self.resolve_intent(&mut state).await,
                Stage::Retrieve => {
                    state.candidates = self.retriever.retrieve(&state.intent.criteria).await;
                }
                Stage::Score => self.score(&mut state),
                Stage::Rerank => self.rerank(&mut state).await,
                Stage::Explain => self.explain(&mut state).await,
                Stage::FeedbackCheck => {
                    if self.feedback.check(&mut state) == FeedbackDecision::Refine {
                        state.previous_matches = state.match_ids();
                    }
                }
                Stage::Done => {}
            }
            state.stage = state.stage.next(state.refinement_needed);
        }

        Ok(self.finish(state))
    }

    async fn analyze_profile(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        let timeout = self.config.call_timeout;

        state.profile = bounded(timeout, self.user_data.get_profile(&state.user_id))
            .await
            .map_err(|err| {
                warn!(error = %err, kind = err.kind(), "profile could not be loaded");
                PipelineError::from_profile_error(&state.user_id, err)
            })?;

        state.history = match bounded(timeout, self.user_data.get_history(&state.user_id)).await {
            Ok(history) => history,
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "history unavailable; continuing without it");
                record_fallback(Stage::AnalyzeProfile);
                Vec::new()
            }
        };

        debug!(
            interests = state.profile.interests.len(),
            history = state.history.len(),
            "profile loaded"
        );
        Ok(())
    }

    async fn resolve_intent(&self, state: &mut PipelineState) {
        let query = IntentQuery {
            query: state.query.clone(),
            profile: ProfileContext::new(&state.profile, &state.history),
            context: state.context.clone(),
            feedback: state
                .feedback
                .clone()
                .or_else(|| state.applied_feedback.clone()),
            previous_matches: state.previous_matches.clone(),
            iteration: state.iteration_count,
        };

        state.intent = match bounded(self.config.call_timeout, self.intent.resolve(&query)).await {
            Ok(mut intent) => {
                intent.criteria.anchor_to_profile(&state.profile);
                intent
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "intent resolution failed; using profile preferences");
                record_fallback(Stage::ResolveIntent);
                ResolvedIntent::fallback_for(&state.profile)
            }
        };
    }

    fn score(&self, state: &mut PipelineState) {
        let candidates = std::mem::take(&mut state.candidates);
        let considered = candidates.len();

        let scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|project| {
                let score = self.scorer.score(&state.profile, &project);
                ScoredCandidate { project, score }
            })
            .collect();

        state.matches = select_top(scored, self.config.max_matches);
        debug!(considered, kept = state.matches.len(), "scored candidates");
    }

    async fn rerank(&self, state: &mut PipelineState) {
        if state.matches.is_empty() {
            return;
        }

        let request = RerankRequest {
            query: state.query.clone(),
            profile: ProfileContext::new(&state.profile, &state.history),
            candidates: state
                .matches
                .iter()
                .map(|candidate| RerankCandidate {
                    id: candidate.id().to_string(),
                    name: candidate.project.name.clone(),
                    category: candidate.project.category.clone(),
                    description: truncate_chars(
                        &candidate.project.description,
                        self.config.rerank_description_chars,
                    ),
                    score: candidate.total(),
                })
                .collect(),
        };

        match bounded(self.config.call_timeout, self.reranker.rank(&request)).await {
            Ok(ranked_ids) => {
                let matches = std::mem::take(&mut state.matches);
                state.matches = reconcile_order(matches, &ranked_ids, ScoredCandidate::id);
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "rerank failed; keeping score order");
                record_fallback(Stage::Rerank);
            }
        }
    }

    async fn explain(&self, state: &mut PipelineState) {
        let mut explanations: BTreeMap<String, String> = state
            .matches
            .iter()
            .map(|candidate| {
                let text = self
                    .scorer
                    .explain(&state.profile, &candidate.project, candidate.total());
                (candidate.id().to_string(), text)
            })
            .collect();

        let general = if state.matches.is_empty() {
            NO_MATCHES_SUMMARY.to_string()
        } else {
            self.narrate(state, &explanations).await
        };
        explanations.insert(GENERAL_EXPLANATION_KEY.to_string(), general);

        state.explanations = explanations;
    }

    async fn narrate(&self, state: &PipelineState, explanations: &BTreeMap<String, String>) -> String {
        let request = NarrationRequest {
            profile: ProfileContext::new(&state.profile, &state.history),
            matches: state
                .matches
                .iter()
                .take(self.config.summary_matches)
                .map(|candidate| NarratedMatch {
                    id: candidate.id().to_string(),
                    name: candidate.project.name.clone(),
                    score: candidate.total(),
                    explanation: explanations.get(candidate.id()).cloned().unwrap_or_default(),
                })
                .collect(),
        };

        match bounded(self.config.call_timeout, self.narrator.summarize(&request)).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                warn!("narrator returned an empty summary; using default text");
                record_fallback(Stage::Explain);
                NARRATOR_FALLBACK.to_string()
            }
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "narrator failed; using default text");
                record_fallback(Stage::Explain);
                NARRATOR_FALLBACK.to_string()
            }
        }
    }

    fn finish(&self, state: PipelineState) -> MatchOutcome {
        let suggestions = suggestions_for(&state.profile, &state.matches);
        let score_summary = state
            .matches
            .iter()
            .take(self.config.summary_matches)
            .map(|candidate| (candidate.id().to_string(), candidate.total()))
            .collect();

        info!(
            run_id = %state.run_id,
            matches = state.matches.len(),
            iterations = state.iteration_count,
            limit_reached = state.iteration_limit_reached,
            "pipeline run finished"
        );

        MatchOutcome {
            run_id: state.run_id,
            matches: state.matches,
            explanations: state.explanations,
            suggestions,
            score_summary,
            iterations: state.iteration_count,
            iteration_limit_reached: state.iteration_limit_reached,
        }
    }

    /// Scores one catalog project for one user, outside of a full run.
    ///
    /// `Ok(None)` when the catalog does not know the project.
    #[instrument(skip(self))]
    pub async fn explain_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<ProjectExplanation>, PipelineError> {
        let timeout = self.config.call_timeout;

        let profile = bounded(timeout, self.user_data.get_profile(user_id))
            .await
            .map_err(|err| PipelineError::from_profile_error(user_id, err))?;

        let project = match bounded(timeout, self.catalog.get_project(project_id)).await {
            Ok(project) => project,
            Err(ServiceError::NotFound(_)) => None,
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "catalog lookup failed");
                return Err(PipelineError::CatalogUnavailable(err));
            }
        };

        Ok(project.map(|project| {
            let score = self.scorer.score(&profile, &project);
            let explanation = self.scorer.explain(&profile, &project, score.total);
            ProjectExplanation {
                project,
                score,
                explanation,
            }
        }))
    }
}
