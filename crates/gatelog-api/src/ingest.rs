//! Handler for `POST /events/batch`, the ingestion gateway.
//!
//! A batch moves through `received → validated → written | rejected`, and
//! every attempt is then appended to the audit trail. The trail write and the
//! device `last_seen_at` update run in a detached task after the response is
//! decided; their failures are logged and never reach the device.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::HeaderMap,
};
use chrono::Utc;
use gatelog_core::{
  audit::NewSyncAttempt,
  ingest::{Batch, BatchReceipt},
  store::EventStore,
};

use crate::{AppState, device_auth, error::ApiError, origin::Origin};

/// What the audit trail learns while a batch is processed.
#[derive(Default)]
struct Trail {
  attempt:     NewSyncAttempt,
  /// Set once a device credential was accepted.
  seen_device: Option<String>,
}

/// `POST /events/batch`. Body: `{"device_id": "...", "events": [...]}`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  origin: Origin,
  headers: HeaderMap,
  body: Result<Json<Batch>, JsonRejection>,
) -> Result<Json<BatchReceipt>, ApiError>
where
  S: EventStore + 'static,
{
  let mut trail = Trail {
    attempt: NewSyncAttempt {
      remote_addr: origin.remote_addr,
      user_agent: origin.user_agent,
      ..NewSyncAttempt::default()
    },
    seen_device: None,
  };

  let outcome = process(&state, &headers, body, &mut trail).await;
  match &outcome {
    Ok(receipt) => {
      trail.attempt.confirmed_count = count(receipt.confirmed.len());
      tracing::info!(
        device = trail.attempt.device_id.as_deref().unwrap_or("-"),
        received = trail.attempt.received_count,
        confirmed = trail.attempt.confirmed_count,
        "batch accepted"
      );
    }
    Err(e) => {
      trail.attempt.error = Some(e.to_string());
      tracing::info!(
        device = trail.attempt.device_id.as_deref().unwrap_or("-"),
        status = e.status().as_u16(),
        error = %e,
        "batch rejected"
      );
    }
  }

  record_in_background(&state, trail);
  outcome.map(Json)
}

async fn process<S>(
  state: &AppState<S>,
  headers: &HeaderMap,
  body: Result<Json<Batch>, JsonRejection>,
  trail: &mut Trail,
) -> Result<BatchReceipt, ApiError>
where
  S: EventStore,
{
  let Json(batch) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

  trail.attempt.received_count = count(batch.events.len());
  trail.attempt.device_id = batch.declared_device().map(str::to_owned);

  if state.settings.require_device_auth {
    let device =
      device_auth::admit(state.store.as_ref(), headers, batch.declared_device()).await?;
    trail.seen_device = Some(device.device_id);
  }

  let batch = batch.validate()?;

  let confirmed = state
    .store
    .upsert_batch(batch.into_events())
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "batch write failed");
      ApiError::Unavailable("storage unavailable, retry later".into())
    })?;

  Ok(BatchReceipt { confirmed })
}

fn record_in_background<S>(state: &AppState<S>, trail: Trail)
where
  S: EventStore + 'static,
{
  let store = state.store.clone();
  tokio::spawn(async move {
    if let Some(device_id) = trail.seen_device
      && let Err(e) = store.touch_device(device_id.clone(), Utc::now()).await
    {
      tracing::warn!(device = %device_id, error = %e, "failed to update device last_seen_at");
    }
    if let Err(e) = store.record_sync_attempt(trail.attempt).await {
      tracing::warn!(error = %e, "failed to record sync attempt");
    }
  });
}

fn count(n: usize) -> u32 { u32::try_from(n).unwrap_or(u32::MAX) }
