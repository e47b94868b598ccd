//! Handlers for the `/events` read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | Filtered, paginated listing; see [`EventParams`] |
//! | `GET`  | `/events/export` | Same filters, unpaginated, capped |
//! | `GET`  | `/events/{id}` | 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use gatelog_core::{
  event::{Direction, EventId, PersonCategory, StoredEvent},
  query::{EventFilter, Page, PageRequest, ResolvedFilter},
  store::EventStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  admin::Admin,
  error::ApiError,
  params::{Bound, flag, lenient_int, parse_bound},
};

// ─── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EventParams {
  /// Free text over the subject fields, device and scanned code.
  pub q:                  Option<String>,
  pub direction:          Option<Direction>,
  pub category:           Option<PersonCategory>,
  pub device_id:          Option<String>,
  pub area:               Option<String>,
  #[serde(default, deserialize_with = "flag")]
  pub exit_without_entry: Option<bool>,
  #[serde(default, deserialize_with = "flag")]
  pub today:              Option<bool>,
  /// RFC 3339 instant or `YYYY-MM-DD` in the reference zone.
  pub from:               Option<String>,
  pub to:                 Option<String>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub limit:              Option<i64>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub offset:             Option<i64>,
}

impl EventParams {
  fn resolve<S>(&self, state: &AppState<S>) -> Result<ResolvedFilter, ApiError> {
    let zone = &state.settings.zone;
    let filter = EventFilter {
      text:               self.q.clone(),
      direction:          self.direction,
      category:           self.category,
      device_id:          self.device_id.clone(),
      area:               self.area.clone(),
      exit_without_entry: self.exit_without_entry,
      today:              self.today.unwrap_or(false),
      from:               parse_bound(self.from.as_deref(), Bound::From, zone)?,
      to:                 parse_bound(self.to.as_deref(), Bound::To, zone)?,
    };
    filter.resolve(zone, Utc::now()).map_err(ApiError::clock)
  }

  fn page(&self) -> PageRequest { PageRequest::new(self.limit, self.offset) }
}

pub(crate) fn query_params<T>(
  params: Result<Query<T>, QueryRejection>,
) -> Result<T, ApiError> {
  params
    .map(|Query(p)| p)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /events[?q=...][&direction=...][&today=1][&limit=...][&offset=...]`
pub async fn list<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  params: Result<Query<EventParams>, QueryRejection>,
) -> Result<Json<Page<StoredEvent>>, ApiError>
where
  S: EventStore + 'static,
{
  let params = query_params(params)?;
  let filter = params.resolve(&state)?;
  let page = state
    .store
    .query(&filter, params.page())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// `GET /events/export`: same filters as the listing; `limit`/`offset` are
/// ignored.
pub async fn export<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  params: Result<Query<EventParams>, QueryRejection>,
) -> Result<Json<Vec<StoredEvent>>, ApiError>
where
  S: EventStore + 'static,
{
  let filter = query_params(params)?.resolve(&state)?;
  let rows = state
    .store
    .query_for_export(&filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /events/{id}`
pub async fn get_one<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<StoredEvent>, ApiError>
where
  S: EventStore + 'static,
{
  let id = EventId::new(id)?;
  let event = state
    .store
    .get_event(&id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(event))
}
