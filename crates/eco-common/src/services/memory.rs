//! In-process collaborators backed by plain collections. Used for local runs
//! without the EcoNexo API and throughout the tests.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{CatalogService, UserDataService};
use crate::{HistoryEntry, Project, UserProfile, error::ServiceError, retrieval::CatalogQuery};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserData {
    profiles: HashMap<String, UserProfile>,
    histories: HashMap<String, Vec<HistoryEntry>>,
}

impl InMemoryUserData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_history(mut self, user_id: &str, history: Vec<HistoryEntry>) -> Self {
        self.histories.insert(user_id.to_string(), history);
        self
    }
}

#[async_trait]
impl UserDataService for InMemoryUserData {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ServiceError> {
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("profile {user_id}")))
    }

    async fn get_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, ServiceError> {
        Ok(self.histories.get(user_id).cloned().unwrap_or_default())
    }
}

/// Catalog applying the same coarse filters as the EcoNexo API: any of the
/// categories, and city and country compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    projects: Vec<Project>,
}

impl InMemoryCatalog {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }
}

fn same_text(expected: Option<&str>, actual: &str) -> bool {
    expected.map_or(true, |expected| expected.trim().eq_ignore_ascii_case(actual.trim()))
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Project>, ServiceError> {
        Ok(self
            .projects
            .iter()
            .filter(|p| query.categories.is_empty() || query.categories.contains(&p.category))
            .filter(|p| same_text(query.city.as_deref(), &p.city))
            .filter(|p| same_text(query.country.as_deref(), &p.country))
            .cloned()
            .collect())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, ServiceError> {
        Ok(self.projects.iter().find(|p| p.id == project_id).cloned())
    }
}
