use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{IntentQuery, IntentResolver, NarrationRequest, Narrator, RerankRequest, Reranker};
use crate::{
    GeoPoint,
    error::ServiceError,
    retrieval::{ResolvedIntent, SearchCriteria},
    wire::{dedupe_preserving_order, parse_datetime, tag_list, value_as_count, value_as_f64},
};

/// Client for the language service that turns free text into criteria,
/// reorders candidates and writes summaries.
#[derive(Debug, Clone)]
pub struct HttpLanguageService {
    client: Client,
    base_url: String,
}

impl HttpLanguageService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ServiceError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_for_text<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ServiceError> {
        let text = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(strip_code_fences(&text).to_string())
    }
}

const FENCE: &str = "```";

/// Extracts the body of the first markdown code fence in a reply, wherever it
/// sits, dropping a language tag right after the opening fence. Replies
/// without a fence come back trimmed.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(open) = trimmed.find(FENCE) else {
        return trimmed;
    };
    let after_open = &trimmed[open + FENCE.len()..];
    let body = match after_open.find(FENCE) {
        Some(close) => &after_open[..close],
        None => after_open,
    };
    strip_language_tag(body).trim()
}

/// Tags are one lowercase word glued to the fence (`json`, `text`), followed
/// by a newline or a space.
fn strip_language_tag(body: &str) -> &str {
    let Some(tag_len) = body.find(char::is_whitespace) else {
        return body;
    };
    let tag = &body[..tag_len];
    let is_tag = tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if is_tag { &body[tag_len..] } else { body }
}

/// Converts the resolver's loosely typed JSON into a [`ResolvedIntent`].
pub fn intent_from_reply(reply: &Value) -> Result<ResolvedIntent, ServiceError> {
    let Some(fields) = reply.as_object() else {
        return Err(ServiceError::Malformed("intent reply is not an object".into()));
    };

    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let number = |key: &str| fields.get(key).and_then(value_as_f64);

    let location = match (number("lat"), number("lng")) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    };

    let min_spots = ["min_spots", "available_spots"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(value_as_count));

    let criteria = SearchCriteria {
        categories: dedupe_preserving_order(tag_list(fields.get("category"))),
        city: text("city"),
        country: text("country"),
        location,
        radius_km: number("radius_km").filter(|km| km.is_finite() && *km > 0.0),
        date_from: text("date_from").as_deref().and_then(parse_datetime),
        date_to: text("date_to").as_deref().and_then(parse_datetime),
        accessibility: fields.get("accessibility").and_then(Value::as_bool),
        min_spots,
    };

    Ok(ResolvedIntent {
        criteria,
        is_refinement: fields
            .get("is_refinement")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Accepts a bare list of ids or an object carrying one under `ranked_ids`.
pub fn ranking_from_reply(reply: &Value) -> Result<Vec<String>, ServiceError> {
    let list = match reply {
        Value::Array(items) => items,
        Value::Object(fields) => match fields.get("ranked_ids") {
            Some(Value::Array(items)) => items,
            _ => return Err(ServiceError::Malformed("rerank reply has no ranked_ids".into())),
        },
        _ => return Err(ServiceError::Malformed("rerank reply is not a list".into())),
    };

    Ok(list
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl IntentResolver for HttpLanguageService {
    #[instrument(skip_all, fields(iteration = query.iteration))]
    async fn resolve(&self, query: &IntentQuery) -> Result<ResolvedIntent, ServiceError> {
        let reply = self.post_for_text("intent", query).await?;
        let value: Value = serde_json::from_str(&reply)?;
        let intent = intent_from_reply(&value)?;
        debug!(categories = intent.criteria.categories.len(), refinement = intent.is_refinement, "intent resolved");
        Ok(intent)
    }
}

#[async_trait]
impl Reranker for HttpLanguageService {
    #[instrument(skip_all, fields(candidates = request.candidates.len()))]
    async fn rank(&self, request: &RerankRequest) -> Result<Vec<String>, ServiceError> {
        let reply = self.post_for_text("rerank", request).await?;
        let value: Value = serde_json::from_str(&reply)?;
        ranking_from_reply(&value)
    }
}

#[async_trait]
impl Narrator for HttpLanguageService {
    #[instrument(skip_all, fields(matches = request.matches.len()))]
    async fn summarize(&self, request: &NarrationRequest) -> Result<String, ServiceError> {
        let reply = self.post_for_text("summarize", request).await?;
        if reply.is_empty() {
            return Err(ServiceError::Malformed("empty summary".into()));
        }
        Ok(reply)
    }
}

/// Stand-in used when no language service is configured. Every call fails,
/// so each dependent stage takes its fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLanguageService;

#[async_trait]
impl IntentResolver for DisabledLanguageService {
    async fn resolve(&self, _query: &IntentQuery) -> Result<ResolvedIntent, ServiceError> {
        Err(ServiceError::Disabled("intent resolver"))
    }
}

#[async_trait]
impl Reranker for DisabledLanguageService {
    async fn rank(&self, _request: &RerankRequest) -> Result<Vec<String>, ServiceError> {
        Err(ServiceError::Disabled("reranker"))
    }
}

#[async_trait]
impl Narrator for DisabledLanguageService {
    async fn summarize(&self, _request: &NarrationRequest) -> Result<String, ServiceError> {
        Err(ServiceError::Disabled("narrator"))
    }
}
