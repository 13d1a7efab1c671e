pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod retrieval;
pub mod run_id;
pub mod services;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Commonly used data models for matching functions.

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default, deserialize_with = "wire::lenient_f64")]
    pub lat: f64,
    #[serde(default, deserialize_with = "wire::lenient_f64")]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl UserLocation {
    /// Coordinates are only usable when both components are present.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, rename = "maxDistance")]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    #[serde(default)]
    pub preferred_times: Vec<String>,
    #[serde(default, rename = "difficulty")]
    pub difficulty_levels: Vec<String>,
    #[serde(default, rename = "accessibility")]
    pub accessibility_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: UserLocation,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub impact_score: f64,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::string_or_default")]
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub name_de: Option<String>,
    #[serde(default, deserialize_with = "wire::string_or_default")]
    pub description: String,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_de: Option<String>,
    #[serde(default, deserialize_with = "wire::string_or_default")]
    pub category: String,
    #[serde(default, deserialize_with = "wire::string_or_default")]
    pub city: String,
    #[serde(default, deserialize_with = "wire::string_or_default")]
    pub country: String,
    #[serde(flatten)]
    pub location: GeoPoint,
    #[serde(default, rename = "spots", deserialize_with = "wire::spots")]
    pub available_spots: u32,
    #[serde(default, rename = "startsAt", deserialize_with = "wire::opt_datetime")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "endsAt", deserialize_with = "wire::opt_datetime")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "isPermanent")]
    pub is_permanent: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub info_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl HistoryEntry {
    /// Entries that represent actual participation in a project or event.
    pub fn is_participation(&self) -> bool {
        matches!(self.kind.as_str(), "event" | "project")
    }
}
