use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Project, UserProfile,
    matching::{ranking::ScoredCandidate, similarity::profile_similarity},
    pipeline::{MatchOutcome, ProjectExplanation},
};

/// Project as presented to clients, with its localized fields, links and
/// schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub name_en: Option<String>,
    pub name_de: Option<String>,
    pub description: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub category: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub spots: u32,
    pub image_url: Option<String>,
    pub info_url: Option<String>,
    #[serde(rename = "startsAt")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(rename = "endsAt")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(rename = "isPermanent")]
    pub is_permanent: bool,
    /// Match score in `[0, 100]`.
    pub score: f64,
}

impl ProjectView {
    pub fn new(project: &Project, score: f64) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            name_en: project.name_en.clone(),
            name_de: project.name_de.clone(),
            description: project.description.clone(),
            description_en: project.description_en.clone(),
            description_de: project.description_de.clone(),
            category: project.category.clone(),
            city: project.city.clone(),
            country: project.country.clone(),
            lat: project.location.lat,
            lng: project.location.lng,
            spots: project.available_spots,
            image_url: project.image_url.clone(),
            info_url: project.info_url.clone(),
            starts_at: project.starts_at,
            ends_at: project.ends_at,
            is_permanent: project.is_permanent,
            score,
        }
    }
}

impl From<&ScoredCandidate> for ProjectView {
    fn from(candidate: &ScoredCandidate) -> Self {
        Self::new(&candidate.project, candidate.total())
    }
}

/// Response of `POST /match` and `POST /refine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matches: Vec<ProjectView>,
    /// Project id, or `general`, to explanation text.
    pub explanations: BTreeMap<String, String>,
    pub suggestions: Vec<String>,
    /// Scores of the leading matches by project id.
    pub score_summary: BTreeMap<String, f64>,
    pub run_id: String,
    pub iterations: u32,
    pub iteration_limit_reached: bool,
}

impl From<MatchOutcome> for MatchResponse {
    fn from(outcome: MatchOutcome) -> Self {
        Self {
            matches: outcome.matches.iter().map(ProjectView::from).collect(),
            explanations: outcome.explanations,
            suggestions: outcome.suggestions,
            score_summary: outcome.score_summary.into_iter().collect(),
            run_id: outcome.run_id,
            iterations: outcome.iterations,
            iteration_limit_reached: outcome.iteration_limit_reached,
        }
    }
}

/// Response of `POST /explain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub project_id: String,
    pub score: f64,
    pub explanation: String,
}

impl From<ProjectExplanation> for ExplainResponse {
    fn from(explained: ProjectExplanation) -> Self {
        Self {
            project_id: explained.project.id,
            score: explained.score.total,
            explanation: explained.explanation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarUser {
    pub id: String,
    pub name: String,
    pub similarity: f64,
    pub interests: Vec<String>,
}

impl SimilarUser {
    pub fn new(target: &UserProfile, other: &UserProfile) -> Self {
        Self {
            id: other.id.clone(),
            name: other.name.clone(),
            similarity: profile_similarity(target, other),
            interests: other.interests.clone(),
        }
    }
}

/// Response of `POST /api/users/similar`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarUsersResponse {
    pub users: Vec<SimilarUser>,
}
