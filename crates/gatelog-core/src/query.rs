//! Filters and pagination for event listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  event::{Direction, PersonCategory},
  zone::ReferenceZone,
};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Upper bound on any page size.
pub const MAX_PAGE_LIMIT: u32 = 200;
/// Upper bound on unpaginated export queries.
pub const EXPORT_ROW_CAP: u32 = 5000;

// ─── Time range ──────────────────────────────────────────────────────────────

/// An inclusive `[from, to]` range over `occurred_at`; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
  pub from: Option<DateTime<Utc>>,
  pub to:   Option<DateTime<Utc>>,
}

impl TimeRange {
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Caller-facing filter for [`crate::store::EventStore::query`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
  /// Case-insensitive substring matched against name, employee number,
  /// company, area, purpose, plate, device and scanned code.
  pub text:               Option<String>,
  pub direction:          Option<Direction>,
  pub category:           Option<PersonCategory>,
  pub device_id:          Option<String>,
  pub area:               Option<String>,
  pub exit_without_entry: Option<bool>,
  /// Restrict to the current reference day. Overrides `from`/`to`.
  pub today:              bool,
  pub from:               Option<DateTime<Utc>>,
  pub to:                 Option<DateTime<Utc>>,
}

/// An [`EventFilter`] with the `today` shortcut turned into a concrete range
/// and blank strings dropped. This is what stores consume.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFilter {
  pub text:               Option<String>,
  pub direction:          Option<Direction>,
  pub category:           Option<PersonCategory>,
  pub device_id:          Option<String>,
  pub area:               Option<String>,
  pub exit_without_entry: Option<bool>,
  pub range:              TimeRange,
}

impl EventFilter {
  /// The anomaly listing: exits flagged at capture time as having no entry.
  pub fn exits_without_entry() -> Self {
    Self {
      direction: Some(Direction::Exit),
      exit_without_entry: Some(true),
      ..Self::default()
    }
  }

  pub fn resolve(
    &self,
    zone: &ReferenceZone,
    now: DateTime<Utc>,
  ) -> Result<ResolvedFilter> {
    let range = if self.today {
      zone.today(now)?
    } else {
      TimeRange { from: self.from, to: self.to }
    };

    let non_blank = |v: &Option<String>| {
      v.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
    };

    Ok(ResolvedFilter {
      text: non_blank(&self.text),
      direction: self.direction,
      category: self.category,
      device_id: non_blank(&self.device_id),
      area: non_blank(&self.area),
      exit_without_entry: self.exit_without_entry,
      range,
    })
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Offset/limit pagination. Construct with [`PageRequest::new`] to get the
/// clamping applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub limit:  u32,
  pub offset: u32,
}

impl PageRequest {
  /// Clamp `limit` into `1..=MAX_PAGE_LIMIT` (default
  /// [`DEFAULT_PAGE_LIMIT`]); `offset` defaults to zero.
  pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
    let limit = limit
      .unwrap_or(i64::from(DEFAULT_PAGE_LIMIT))
      .clamp(1, i64::from(MAX_PAGE_LIMIT));
    let offset = offset.unwrap_or(0).clamp(0, i64::from(u32::MAX));
    Self { limit: limit as u32, offset: offset as u32 }
  }
}

impl Default for PageRequest {
  fn default() -> Self { Self::new(None, None) }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
  pub total:  u64,
  pub limit:  u32,
  pub offset: u32,
  pub items:  Vec<T>,
}

impl<T> Page<T> {
  pub fn new(request: PageRequest, total: u64, items: Vec<T>) -> Self {
    Self { total, limit: request.limit, offset: request.offset, items }
  }
}
