//! Handler for `GET /health`. Never requires credentials.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use gatelog_core::store::EventStore;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
  pub ok: bool,
  /// Whether the store answered a round-trip.
  pub db: bool,
  pub at: DateTime<Utc>,
}

/// `GET /health`
pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Health>
where
  S: EventStore + 'static,
{
  let db = match state.store.ping().await {
    Ok(()) => true,
    Err(e) => {
      tracing::warn!(error = %e, "health check could not reach the store");
      false
    }
  };
  Json(Health { ok: true, db, at: Utc::now() })
}
