//! Handlers for occupancy and anomalies.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use gatelog_core::{
  event::StoredEvent,
  occupancy::{InsideEntry, OccupancySnapshot, OccupancyWindow},
  query::{EventFilter, Page},
  store::EventStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  admin::Admin,
  error::ApiError,
  events::query_params,
  params::{PageParams, flag, lenient_int},
};

/// `GET /occupancy`
pub async fn snapshot<S>(
  _: Admin,
  State(state): State<AppState<S>>,
) -> Result<Json<OccupancySnapshot>, ApiError>
where
  S: EventStore + 'static,
{
  let window = OccupancyWindow::at(Utc::now(), &state.settings.zone)
    .map_err(ApiError::clock)?;
  let snapshot = state
    .store
    .occupancy(window)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(snapshot))
}

/// `GET /occupancy/inside[?limit=...][&offset=...]`
pub async fn inside<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<InsideEntry>>, ApiError>
where
  S: EventStore + 'static,
{
  let page = query_params(params)?.request();
  let inside = state
    .store
    .inside(page)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(inside))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnomalyParams {
  #[serde(default, deserialize_with = "flag")]
  pub today:  Option<bool>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub limit:  Option<i64>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub offset: Option<i64>,
}

/// `GET /anomalies[?today=1]`: exits the device flagged as having no entry.
pub async fn anomalies<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  params: Result<Query<AnomalyParams>, QueryRejection>,
) -> Result<Json<Page<StoredEvent>>, ApiError>
where
  S: EventStore + 'static,
{
  let params = query_params(params)?;
  let filter = EventFilter {
    today: params.today.unwrap_or(false),
    ..EventFilter::exits_without_entry()
  }
  .resolve(&state.settings.zone, Utc::now())
  .map_err(ApiError::clock)?;
  let page = PageParams { limit: params.limit, offset: params.offset }.request();

  let listing = state
    .store
    .query(&filter, page)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(listing))
}
