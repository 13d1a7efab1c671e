//! Capability traits for the collaborators the pipeline depends on, plus
//! the HTTP adapters used in production.

pub mod http;
pub mod language;
pub mod memory;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{HttpCatalogService, HttpUserDataService};
pub use language::{DisabledLanguageService, HttpLanguageService};
pub use memory::{InMemoryCatalog, InMemoryUserData};

use crate::{
    HistoryEntry, Project, UserProfile, error::ServiceError, pipeline::feedback::Feedback,
    retrieval::{CatalogQuery, ResolvedIntent},
};

#[async_trait]
pub trait UserDataService: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ServiceError>;

    async fn get_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, ServiceError>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Coarse filtering only: categories, city and country.
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Project>, ServiceError>;

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, ServiceError>;
}

#[async_trait]
pub trait IntentResolver: Send + Sync {
    async fn resolve(&self, query: &IntentQuery) -> Result<ResolvedIntent, ServiceError>;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Project ids, best first. May be partial or contain unknown ids.
    async fn rank(&self, request: &RerankRequest) -> Result<Vec<String>, ServiceError>;
}

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn summarize(&self, request: &NarrationRequest) -> Result<String, ServiceError>;
}

/// What the language collaborators get to know about the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub interests: Vec<String>,
    pub preferred_categories: Vec<String>,
    pub max_distance_km: Option<f64>,
    pub past_events: usize,
}

impl ProfileContext {
    pub fn new(profile: &UserProfile, history: &[HistoryEntry]) -> Self {
        Self {
            name: profile.name.clone(),
            city: profile.location.city.clone(),
            country: profile.location.country.clone(),
            interests: profile.interests.clone(),
            preferred_categories: profile.preferences.preferred_categories.clone(),
            max_distance_km: profile.preferences.max_distance_km,
            past_events: history.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentQuery {
    pub query: String,
    pub profile: ProfileContext,
    pub context: Option<serde_json::Value>,
    pub feedback: Option<Feedback>,
    pub previous_matches: Vec<String>,
    pub iteration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankCandidate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RerankRequest {
    pub query: String,
    pub profile: ProfileContext,
    pub candidates: Vec<RerankCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarratedMatch {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NarrationRequest {
    pub profile: ProfileContext,
    pub matches: Vec<NarratedMatch>,
}

/// Runs a collaborator call with a hard upper bound on its duration.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(limit)),
    }
}
