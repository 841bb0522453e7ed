//! Lenient request value parsing.
//!
//! Browser clients send dates straight from `<input type="date">` and
//! `<input type="datetime-local">` controls, and send `""` for cleared
//! fields. These helpers accept those shapes alongside RFC 3339.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer};
use uuid::Uuid;

use notabene_core::{NoteListQuery, TaskListQuery};

use crate::ApiError;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a client-supplied timestamp.
///
/// Accepts:
/// - RFC 3339: `2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+02:00`
/// - Local date and time without offset: `2024-01-15T10:30`
/// - Date only, meaning local midnight: `2024-01-15`
/// - Empty string, meaning no value
pub fn parse_client_datetime(s: &str) -> Result<Option<DateTime<Utc>>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    match naive {
        Some(naive) => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .ok_or_else(|| format!("'{}' does not exist in the server time zone", s)),
        None => Err(format!(
            "Invalid date '{}'. Expected RFC 3339 (e.g. '2024-01-15T10:30:00Z'), \
             'YYYY-MM-DDTHH:MM' or 'YYYY-MM-DD'",
            s
        )),
    }
}

fn parse_client_uuid(s: &str) -> Result<Option<Uuid>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(s)
        .map(Some)
        .map_err(|_| format!("Invalid id '{}'", s))
}

/// `Option<DateTime<Utc>>` field; `null` and `""` both mean none.
pub fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_client_datetime(&s).map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// Patch field: absent stays `None` (via `#[serde(default)]`), `null` or
/// `""` becomes `Some(None)`.
pub fn patch_datetime<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_client_datetime(&s)
            .map(Some)
            .map_err(de::Error::custom),
        None => Ok(Some(None)),
    }
}

/// `Option<Uuid>` field; `null` and `""` both mean none.
pub fn optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_client_uuid(&s).map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// Patch variant of [`optional_uuid`].
pub fn patch_uuid<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_client_uuid(&s).map(Some).map_err(de::Error::custom),
        None => Ok(Some(None)),
    }
}

/// Distinguish an explicit `null` from an absent field. Use with
/// `#[serde(default)]`.
pub fn patch_value<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Note listing parameters from raw query pairs.
///
/// `tags` may be repeated (`tags=a&tags=b`), bracketed (`tags[]=a`), or
/// comma-separated (`tags=a,b`).
pub fn note_list_query(pairs: &[(String, String)]) -> Result<NoteListQuery, ApiError> {
    let mut tag_ids = Vec::new();
    for (_, value) in pairs.iter().filter(|(k, _)| k == "tags" || k == "tags[]") {
        for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id = Uuid::parse_str(raw)
                .map_err(|_| ApiError::BadRequest(format!("Invalid tag id '{}'", raw)))?;
            tag_ids.push(id);
        }
    }

    Ok(NoteListQuery::from_params(
        last_value(pairs, "search"),
        tag_ids,
        last_value(pairs, "sort"),
        last_value(pairs, "order"),
        is_truthy(last_value(pairs, "archived")),
    ))
}

/// Task listing parameters from raw query pairs.
pub fn task_list_query(pairs: &[(String, String)]) -> TaskListQuery {
    TaskListQuery::from_params(
        last_value(pairs, "filter"),
        last_value(pairs, "sort"),
        last_value(pairs, "order"),
    )
}
