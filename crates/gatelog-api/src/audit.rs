//! Handler for `GET /sync-attempts`, the ingestion audit trail.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use gatelog_core::{
  audit::{SyncAttempt, SyncAttemptFilter},
  query::{Page, PageRequest},
  store::EventStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  admin::Admin,
  error::ApiError,
  events::query_params,
  params::{flag, lenient_int},
};

#[derive(Debug, Default, Deserialize)]
pub struct SyncAttemptParams {
  pub device_id:   Option<String>,
  #[serde(default, deserialize_with = "flag")]
  pub errors_only: Option<bool>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub limit:       Option<i64>,
  #[serde(default, deserialize_with = "lenient_int")]
  pub offset:      Option<i64>,
}

/// `GET /sync-attempts[?device_id=...][&errors_only=1][&limit=...][&offset=...]`
pub async fn list<S>(
  _: Admin,
  State(state): State<AppState<S>>,
  params: Result<Query<SyncAttemptParams>, QueryRejection>,
) -> Result<Json<Page<SyncAttempt>>, ApiError>
where
  S: EventStore + 'static,
{
  let params = query_params(params)?;
  let filter = SyncAttemptFilter {
    device_id:   params.device_id,
    errors_only: params.errors_only.unwrap_or(false),
  };
  let attempts = state
    .store
    .list_sync_attempts(&filter, PageRequest::new(params.limit, params.offset))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(attempts))
}
