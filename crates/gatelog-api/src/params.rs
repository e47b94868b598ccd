//! Query-string helpers shared by the listing endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use gatelog_core::{query::PageRequest, zone::ReferenceZone};
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// `limit` / `offset` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  #[serde(default, deserialize_with = "lenient_int")]
  pub limit:  Option<i64>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub offset: Option<i64>,
}

impl PageParams {
  pub fn request(&self) -> PageRequest { PageRequest::new(self.limit, self.offset) }
}

/// Lenient boolean: `1/true/yes` and `0/false/no`, case-insensitive.
/// Anything else, including an empty value, reads as absent.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(deserializer)?;
  Ok(raw.and_then(|v| parse_flag(&v)))
}

/// Lenient integer for paging: the leading `[+-]digits` of the value, so
/// `"20abc"` reads as 20. Anything without leading digits reads as absent and
/// falls back to the default.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(deserializer)?;
  Ok(raw.and_then(|v| parse_int_prefix(&v)))
}

pub fn parse_int_prefix(value: &str) -> Option<i64> {
  let value = value.trim();
  let digits_from = usize::from(value.starts_with(['+', '-']));
  let end = value[digits_from..]
    .find(|c: char| !c.is_ascii_digit())
    .map_or(value.len(), |i| i + digits_from);
  value[..end].parse().ok()
}

pub fn parse_flag(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" => Some(true),
    "0" | "false" | "no" => Some(false),
    _ => None,
  }
}

/// Which end of a range a date-only bound stands for.
#[derive(Debug, Clone, Copy)]
pub enum Bound {
  From,
  To,
}

/// Parse a `from`/`to` bound: an RFC 3339 instant, or a bare `YYYY-MM-DD`
/// taken as the start (or end) of that day in the reference zone.
pub fn parse_bound(
  value: Option<&str>,
  bound: Bound,
  zone: &ReferenceZone,
) -> Result<Option<DateTime<Utc>>, ApiError> {
  let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
    return Ok(None);
  };

  if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
    return Ok(Some(instant.with_timezone(&Utc)));
  }

  let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map_err(|_| ApiError::BadRequest(format!("invalid date: {value}")))?;
  let day = zone.day(date)?;
  Ok(match bound {
    Bound::From => day.from,
    Bound::To => day.to,
  })
}
