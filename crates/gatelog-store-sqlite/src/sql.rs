//! SQL building blocks shared by the store queries.

use gatelog_core::{
  event::PersonCategory, identity::IdentityKey, query::ResolvedFilter,
};
use rusqlite::{functions::FunctionFlags, types::Value};
use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};

use crate::encode::encode_dt;

// ─── Functions ───────────────────────────────────────────────────────────────

/// Register the store's scalar functions on `conn`:
///
/// - `identity_key(plate, category, employee_number, scanned_code)`: the
///   canonical key string, or NULL for keyless events.
/// - `fold(text)`: see [`fold`]; NULL stays NULL.
///
/// Must run on every connection before any query.
pub fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.as_deref().map(fold))
    },
  )?;

  conn.create_scalar_function(
    "identity_key",
    4,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let plate: Option<String> = ctx.get(0)?;
      let category: Option<String> = ctx.get(1)?;
      let employee_number: Option<String> = ctx.get(2)?;
      let scanned_code: Option<String> = ctx.get(3)?;

      // Unknown text never groups by employee number.
      let category = category
        .as_deref()
        .and_then(|c| c.parse().ok())
        .unwrap_or(PersonCategory::Visitor);

      Ok(
        IdentityKey::derive(
          plate.as_deref(),
          category,
          employee_number.as_deref(),
          scanned_code.as_deref(),
        )
        .map(|key| key.to_string()),
      )
    },
  )
}

/// Case- and accent-insensitive form of `text` for searching: decomposed,
/// combining marks dropped, lowercased. `"JOSÉ NUÑEZ"` folds to `"jose nunez"`.
pub fn fold(text: &str) -> String {
  text
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase()
}

/// The identity key expression over the `events` columns.
pub const IDENTITY_KEY_EXPR: &str =
  "identity_key(plate, category, employee_number, scanned_code)";

// ─── WHERE clauses ───────────────────────────────────────────────────────────

/// Columns searched by the free-text filter.
const TEXT_COLUMNS: [&str; 8] = [
  "name",
  "employee_number",
  "company",
  "area",
  "purpose",
  "plate",
  "device_id",
  "scanned_code",
];

/// A `WHERE` clause with positional `?` parameters.
#[derive(Debug, Default)]
pub struct WhereClause {
  conditions: Vec<String>,
  params:     Vec<Value>,
}

impl WhereClause {
  pub fn push(&mut self, condition: impl Into<String>, param: impl Into<Value>) {
    self.conditions.push(condition.into());
    self.params.push(param.into());
  }

  /// `" WHERE a AND b"`, or an empty string when there are no conditions.
  pub fn sql(&self) -> String {
    if self.conditions.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", self.conditions.join(" AND "))
    }
  }

  pub fn params(&self) -> &[Value] { &self.params }

  pub fn into_params(self) -> Vec<Value> { self.params }
}

/// Translate an event filter into a clause over the `events` table.
pub fn event_filter(filter: &ResolvedFilter) -> WhereClause {
  let mut clause = WhereClause::default();

  if let Some(text) = &filter.text {
    let needle = format!("%{}%", escape_like(&fold(text)));
    let condition = TEXT_COLUMNS
      .iter()
      .map(|col| format!("fold({col}) LIKE ? ESCAPE '\\'"))
      .collect::<Vec<_>>()
      .join(" OR ");
    clause.conditions.push(format!("({condition})"));
    clause
      .params
      .extend(TEXT_COLUMNS.iter().map(|_| Value::Text(needle.clone())));
  }
  if let Some(direction) = filter.direction {
    clause.push("direction = ?", direction.as_ref().to_owned());
  }
  if let Some(category) = filter.category {
    clause.push("category = ?", category.as_ref().to_owned());
  }
  if let Some(device_id) = &filter.device_id {
    clause.push("device_id = ?", device_id.clone());
  }
  if let Some(area) = &filter.area {
    clause.push("area = ?", area.clone());
  }
  if let Some(flag) = filter.exit_without_entry {
    clause.push("exit_without_entry = ?", i64::from(flag));
  }
  if let Some(from) = filter.range.from {
    clause.push("occurred_at >= ?", encode_dt(from));
  }
  if let Some(to) = filter.range.to {
    clause.push("occurred_at <= ?", encode_dt(to));
  }

  clause
}

/// Escape `\`, `%` and `_` so they match literally under `ESCAPE '\'`.
pub fn escape_like(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len());
  for c in needle.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}
