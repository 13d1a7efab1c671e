//! Lenient decoding helpers for records coming from upstream APIs.
//!
//! The catalog and profile services are loosely typed: numbers arrive as
//! strings, lists arrive as comma separated text, dates arrive with or
//! without a time component. Everything is normalized here so the matching
//! core only ever sees the typed records from the crate root.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64).unwrap_or(0.0))
}

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

pub fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn spots<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_count).unwrap_or(0))
}

pub fn opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_datetime))
}

/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (treated as UTC) or a bare date
/// (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whole, non-negative counts only. Fractions, negatives, `NaN` and
/// infinities are treated as absent rather than rounded or saturated.
pub fn value_as_count(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let n = value_as_f64(value)?;
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as u32)
}

/// Tags delivered either as a JSON list or as a comma separated string.
pub fn tag_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Drops repeated tags, keeping the first occurrence.
pub fn dedupe_preserving_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Project;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn decodes_loosely_typed_project() {
        let project: Project = serde_json::from_value(json!({
            "id": 42,
            "name": "Limpieza del río",
            "description": null,
            "category": "Medio ambiente",
            "lat": "40.5",
            "lng": -3.7,
            "spots": 12,
            "startsAt": "2025-03-01",
            "endsAt": "2025-03-02T18:00:00Z",
            "isPermanent": false
        }))
        .unwrap();

        assert_eq!(project.id, "42");
        assert_eq!(project.description, "");
        assert_eq!(project.location.lat, 40.5);
        assert_eq!(project.location.lng, -3.7);
        assert_eq!(project.available_spots, 12);
        assert_eq!(project.starts_at.unwrap().day(), 1);
        assert_eq!(project.ends_at.unwrap().hour(), 18);
    }

    #[test]
    fn missing_coordinates_and_spots_default_to_zero() {
        let project: Project = serde_json::from_value(json!({
            "id": "p-1",
            "spots": -3
        }))
        .unwrap();

        assert_eq!(project.location.lat, 0.0);
        assert_eq!(project.location.lng, 0.0);
        assert_eq!(project.available_spots, 0);
        assert!(project.starts_at.is_none());
    }

    #[test]
    fn unusable_spot_counts_are_treated_as_absent() {
        for raw in [json!(2.5), json!("NaN"), json!("inf"), json!("-1"), json!(5_000_000_000u64)] {
            let project: Project = serde_json::from_value(json!({ "id": "p", "spots": raw })).unwrap();
            assert_eq!(project.available_spots, 0, "spots = {raw}");
        }

        let project: Project = serde_json::from_value(json!({ "id": "p", "spots": "7" })).unwrap();
        assert_eq!(project.available_spots, 7);
    }

    #[test]
    fn counts_accept_whole_numbers_only() {
        assert_eq!(value_as_count(&json!(3)), Some(3));
        assert_eq!(value_as_count(&json!(3.0)), Some(3));
        assert_eq!(value_as_count(&json!(" 4 ")), Some(4));
        assert_eq!(value_as_count(&json!(0.5)), None);
        assert_eq!(value_as_count(&json!("infinity")), None);
        assert_eq!(value_as_count(&json!(null)), None);
    }

    #[test]
    fn parses_supported_datetime_shapes() {
        assert!(parse_datetime("2025-06-01T10:00:00+02:00").is_some());
        assert!(parse_datetime("2025-06-01T10:00:00").is_some());
        assert!(parse_datetime("2025-06-01").is_some());
        assert!(parse_datetime("next tuesday").is_none());
        assert!(parse_datetime("   ").is_none());
    }

    #[test]
    fn tag_list_accepts_strings_and_arrays() {
        let from_text = tag_list(Some(&json!("reciclaje, huertos ,")));
        assert_eq!(from_text, vec!["reciclaje", "huertos"]);

        let from_array = tag_list(Some(&json!(["a", 1, " b "])));
        assert_eq!(from_array, vec!["a", "b"]);

        assert!(tag_list(None).is_empty());
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let tags = vec!["b".to_string(), "a".into(), "b".into()];
        assert_eq!(dedupe_preserving_order(tags), vec!["b", "a"]);
    }
}
