use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{CatalogService, UserDataService};
use crate::{
    HistoryEntry, Preferences, Project, UserLocation, UserProfile,
    error::ServiceError,
    retrieval::CatalogQuery,
    wire::{dedupe_preserving_order, tag_list, value_as_f64},
};

const DEFAULT_PREFERRED_TIMES: [&str; 2] = ["morning", "afternoon"];
const DEFAULT_DIFFICULTY: [&str; 2] = ["easy", "medium"];

fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ServiceError::Transport(format!("failed to build http client: {err}")))
}

fn trimmed_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Profiles and participation history from the EcoNexo API.
#[derive(Debug, Clone)]
pub struct HttpUserDataService {
    client: Client,
    base_url: String,
}

impl HttpUserDataService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trimmed_base(base_url),
        })
    }
}

#[async_trait]
impl UserDataService for HttpUserDataService {
    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ServiceError> {
        let response = self
            .client
            .get(format!("{}/profiles", self.base_url))
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("profile {user_id}")));
        }

        let body: Value = response.error_for_status()?.json().await?;
        let record = match body {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| ServiceError::NotFound(format!("profile {user_id}")))?,
            Value::Null => return Err(ServiceError::NotFound(format!("profile {user_id}"))),
            other => other,
        };

        profile_from_upstream(user_id, &record)
    }

    #[instrument(skip(self))]
    async fn get_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/events/registrations", self.base_url))
            .query(&[("user_id", user_id)])
            .send()
            .await?
            .error_for_status()?;

        let registrations: Vec<Value> = response.json().await?;
        Ok(registrations.iter().filter_map(history_from_registration).collect())
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn tags_or_default(record: &Value, key: &str, default: &[&str]) -> Vec<String> {
    match record.get(key) {
        None | Some(Value::Null) => default.iter().map(|s| s.to_string()).collect(),
        value => tag_list(value),
    }
}

/// Maps a loosely typed upstream profile record onto [`UserProfile`].
///
/// Missing coordinates stay missing; no location is invented here.
pub fn profile_from_upstream(user_id: &str, record: &Value) -> Result<UserProfile, ServiceError> {
    if !record.is_object() {
        return Err(ServiceError::Malformed(format!(
            "profile record for {user_id} is not an object"
        )));
    }

    let mut interests = tag_list(record.get("interests"));
    interests.extend(tag_list(record.get("passions")));

    let mut skills = tag_list(record.get("skills"));
    skills.extend(tag_list(record.get("areas_of_expertise")));

    Ok(UserProfile {
        id: string_field(record, "id").unwrap_or_else(|| user_id.to_string()),
        name: string_field(record, "full_name")
            .or_else(|| string_field(record, "name"))
            .unwrap_or_default(),
        location: UserLocation {
            lat: record.get("lat").and_then(value_as_f64),
            lng: record.get("lng").and_then(value_as_f64),
            city: string_field(record, "city"),
            country: string_field(record, "country"),
        },
        interests: dedupe_preserving_order(interests),
        skills: dedupe_preserving_order(skills),
        preferences: Preferences {
            max_distance_km: record.get("max_distance").and_then(value_as_f64),
            preferred_categories: dedupe_preserving_order(tag_list(
                record.get("preferred_categories"),
            )),
            preferred_times: tags_or_default(record, "preferred_times", &DEFAULT_PREFERRED_TIMES),
            difficulty_levels: tags_or_default(record, "preferred_difficulty", &DEFAULT_DIFFICULTY),
            accessibility_required: record
                .get("accessibility_required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        impact_score: record
            .get("impact_score")
            .and_then(value_as_f64)
            .unwrap_or(0.0)
            .max(0.0),
        bio: string_field(record, "bio")
            .or_else(|| string_field(record, "about_me"))
            .unwrap_or_default(),
    })
}

fn history_from_registration(registration: &Value) -> Option<HistoryEntry> {
    let id = string_field(registration, "event_id")?;
    Some(HistoryEntry {
        id,
        kind: "event".into(),
        date: string_field(registration, "created_at"),
        status: string_field(registration, "status").unwrap_or_else(|| "registered".into()),
    })
}

/// Project catalog of the EcoNexo API.
#[derive(Debug, Clone)]
pub struct HttpCatalogService {
    client: Client,
    base_url: String,
}

impl HttpCatalogService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trimmed_base(base_url),
        })
    }
}

/// Decodes each record on its own so one bad project does not hide the rest.
fn decode_projects(records: Vec<Value>) -> Vec<Project> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Project>(record) {
            Ok(project) => Some(project),
            Err(err) => {
                warn!(error = %err, "skipping malformed project record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    #[instrument(skip(self))]
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Project>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/projects", self.base_url))
            .query(&query.to_params())
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        let Value::Array(records) = body else {
            return Err(ServiceError::Malformed("catalog response is not a list".into()));
        };

        let projects = decode_projects(records);
        debug!(count = projects.len(), "catalog returned projects");
        Ok(projects)
    }

    #[instrument(skip(self))]
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/projects", self.base_url))
            .query(&[("id", project_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: Value = response.error_for_status()?.json().await?;
        let project = match body {
            Value::Null => None,
            Value::Array(records) => decode_projects(records)
                .into_iter()
                .find(|project| project.id == project_id),
            record => Some(serde_json::from_value::<Project>(record)?),
        };
        Ok(project)
    }
}
