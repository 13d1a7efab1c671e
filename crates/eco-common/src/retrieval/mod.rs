pub mod filters;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    GeoPoint, Project, UserProfile,
    matching::scoring::effective_max_distance,
    services::{CatalogService, bounded},
};

pub use filters::passes_local_filters;

/// Structured search constraints. `None` (or an empty category list) means
/// "no constraint on this dimension".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accessibility: Option<bool>,
    #[serde(default)]
    pub min_spots: Option<u32>,
}

impl SearchCriteria {
    /// Criteria used when the intent resolver is unavailable: the profile's
    /// preferred categories. The radius is carried without an origin, so no
    /// distance filter applies.
    pub fn fallback_for(profile: &UserProfile) -> Self {
        Self {
            categories: profile.preferences.preferred_categories.clone(),
            radius_km: Some(effective_max_distance(profile)),
            ..Self::default()
        }
    }

    /// Anchors a search without any place constraint at the profile location.
    pub fn anchor_to_profile(&mut self, profile: &UserProfile) {
        if self.city.is_some() || self.location.is_some() {
            return;
        }
        let Some(origin) = profile.location.coordinates() else {
            return;
        };

        self.location = Some(origin);
        if self.radius_km.is_none() {
            self.radius_km = Some(effective_max_distance(profile));
        }
    }

    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery {
            categories: self.categories.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIntent {
    pub criteria: SearchCriteria,
    #[serde(default)]
    pub is_refinement: bool,
}

impl ResolvedIntent {
    pub fn fallback_for(profile: &UserProfile) -> Self {
        Self {
            criteria: SearchCriteria::fallback_for(profile),
            is_refinement: false,
        }
    }
}

/// The subset of criteria the catalog API filters on natively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogQuery {
    pub categories: Vec<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl CatalogQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = self
            .categories
            .iter()
            .map(|category| ("category", category.clone()))
            .collect();
        if let Some(city) = &self.city {
            params.push(("city", city.clone()));
        }
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        params
    }
}

/// Retrieves candidates from the catalog and applies the filters the catalog
/// cannot express. Never fails: catalog errors yield no candidates.
#[derive(Clone)]
pub struct CandidateRetriever {
    catalog: Arc<dyn CatalogService>,
    call_timeout: Duration,
}

impl CandidateRetriever {
    pub fn new(catalog: Arc<dyn CatalogService>, call_timeout: Duration) -> Self {
        Self {
            catalog,
            call_timeout,
        }
    }

    #[instrument(skip_all, fields(categories = criteria.categories.len()))]
    pub async fn retrieve(&self, criteria: &SearchCriteria) -> Vec<Project> {
        let query = criteria.catalog_query();
        let projects = match bounded(self.call_timeout, self.catalog.query(&query)).await {
            Ok(projects) => projects,
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "catalog query failed; continuing without candidates");
                metrics::counter!("eco_pipeline_fallbacks_total", "stage" => "retrieve")
                    .increment(1);
                return Vec::new();
            }
        };

        let fetched = projects.len();
        let candidates: Vec<Project> = projects
            .into_iter()
            .filter(|project| passes_local_filters(criteria, project))
            .collect();

        debug!(fetched, kept = candidates.len(), "applied local filters");
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Preferences, UserLocation, error::ServiceError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubCatalog {
        projects: Result<Vec<Project>, &'static str>,
        seen: Mutex<Vec<CatalogQuery>>,
    }

    #[async_trait]
    impl CatalogService for StubCatalog {
        async fn query(&self, query: &CatalogQuery) -> Result<Vec<Project>, ServiceError> {
            self.seen.lock().unwrap().push(query.clone());
            self.projects
                .clone()
                .map_err(|msg| ServiceError::Transport(msg.into()))
        }

        async fn get_project(&self, _project_id: &str) -> Result<Option<Project>, ServiceError> {
            Ok(None)
        }
    }

    struct HangingCatalog;

    #[async_trait]
    impl CatalogService for HangingCatalog {
        async fn query(&self, _query: &CatalogQuery) -> Result<Vec<Project>, ServiceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![project("late", 0.0)])
        }

        async fn get_project(&self, _project_id: &str) -> Result<Option<Project>, ServiceError> {
            Ok(None)
        }
    }

    fn project(id: &str, lat: f64) -> Project {
        Project {
            id: id.into(),
            location: GeoPoint::new(lat, 0.0),
            available_spots: 3,
            ..Project::default()
        }
    }

    fn profile_at(lat: Option<f64>, lng: Option<f64>) -> UserProfile {
        UserProfile {
            id: "u".into(),
            location: UserLocation {
                lat,
                lng,
                ..UserLocation::default()
            },
            preferences: Preferences {
                max_distance_km: Some(40.0),
                preferred_categories: vec!["Salud".into()],
                ..Preferences::default()
            },
            ..UserProfile::default()
        }
    }

    #[tokio::test]
    async fn forwards_coarse_filters_and_applies_local_ones() {
        let catalog = Arc::new(StubCatalog {
            projects: Ok(vec![project("near", 0.1), project("far", 5.0)]),
            seen: Mutex::new(Vec::new()),
        });
        let retriever = CandidateRetriever::new(catalog.clone(), Duration::from_secs(1));

        let criteria = SearchCriteria {
            categories: vec!["Salud".into(), "Océanos".into()],
            city: Some("Valencia".into()),
            location: Some(GeoPoint::new(0.0, 0.0)),
            radius_km: Some(50.0),
            ..SearchCriteria::default()
        };

        let candidates = retriever.retrieve(&criteria).await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "near");

        let seen = catalog.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].categories, vec!["Salud", "Océanos"]);
        assert_eq!(seen[0].city.as_deref(), Some("Valencia"));
        assert_eq!(seen[0].country, None);
    }

    #[tokio::test]
    async fn catalog_failure_yields_no_candidates() {
        let catalog = Arc::new(StubCatalog {
            projects: Err("connection refused"),
            seen: Mutex::new(Vec::new()),
        });
        let retriever = CandidateRetriever::new(catalog, Duration::from_secs(1));

        assert!(retriever.retrieve(&SearchCriteria::default()).await.is_empty());
    }

    #[tokio::test]
    async fn slow_catalog_is_cut_off_by_timeout() {
        let retriever = CandidateRetriever::new(Arc::new(HangingCatalog), Duration::from_millis(20));

        assert!(retriever.retrieve(&SearchCriteria::default()).await.is_empty());
    }

    #[test]
    fn fallback_criteria_uses_profile_preferences() {
        let criteria = SearchCriteria::fallback_for(&profile_at(Some(1.0), Some(2.0)));

        assert_eq!(criteria.categories, vec!["Salud"]);
        assert_eq!(criteria.radius_km, Some(40.0));
        assert_eq!(criteria.location, None);
    }

    #[test]
    fn anchoring_only_applies_without_place_constraints() {
        let profile = profile_at(Some(1.0), Some(2.0));

        let mut open = SearchCriteria::default();
        open.anchor_to_profile(&profile);
        assert_eq!(open.location, Some(GeoPoint::new(1.0, 2.0)));
        assert_eq!(open.radius_km, Some(40.0));

        let mut explicit_radius = SearchCriteria {
            radius_km: Some(5.0),
            ..SearchCriteria::default()
        };
        explicit_radius.anchor_to_profile(&profile);
        assert_eq!(explicit_radius.radius_km, Some(5.0));

        let mut with_city = SearchCriteria {
            city: Some("Sevilla".into()),
            ..SearchCriteria::default()
        };
        with_city.anchor_to_profile(&profile);
        assert_eq!(with_city.location, None);

        let mut no_coordinates = SearchCriteria::default();
        no_coordinates.anchor_to_profile(&profile_at(Some(1.0), None));
        assert_eq!(no_coordinates.location, None);
    }

    #[test]
    fn catalog_params_repeat_categories() {
        let query = CatalogQuery {
            categories: vec!["Salud".into(), "Educación".into()],
            city: None,
            country: Some("España".into()),
        };

        assert_eq!(
            query.to_params(),
            vec![
                ("category", "Salud".to_string()),
                ("category", "Educación".to_string()),
                ("country", "España".to_string()),
            ]
        );
    }
}
