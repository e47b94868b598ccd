//! JSON REST API for the gate logbook.
//!
//! Exposes an axum [`Router`] backed by any [`gatelog_core::store::EventStore`]:
//! the device ingestion gateway plus the reporting endpoints. TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gatelog_api::api_router(state))
//! ```

pub mod admin;
pub mod audit;
pub mod device_auth;
pub mod error;
pub mod events;
pub mod health;
pub mod ingest;
pub mod occupancy;
pub mod origin;
pub mod params;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gatelog_core::{store::EventStore, zone::ReferenceZone};

pub use admin::AdminCredentials;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Behaviour switches for the API, fixed at startup.
#[derive(Clone, Default)]
pub struct ApiSettings {
  /// Zone whose calendar day defines "today".
  pub zone:                ReferenceZone,
  /// Reject batches without a valid device API key.
  pub require_device_auth: bool,
  /// Basic-auth credentials for the reporting endpoints. `None` leaves them
  /// open.
  pub admin:               Option<AdminCredentials>,
  /// Take the audit trail's remote address from `x-forwarded-for`. Only for
  /// deployments behind a reverse proxy that sets the header.
  pub trust_forwarded_for: bool,
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub settings: Arc<ApiSettings>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, settings: ApiSettings) -> Self {
    Self { store, settings: Arc::new(settings) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      settings: Arc::clone(&self.settings),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: EventStore + 'static,
{
  Router::new()
    // Ingestion
    .route("/events/batch", post(ingest::submit::<S>))
    // Event log
    .route("/events", get(events::list::<S>))
    .route("/events/export", get(events::export::<S>))
    .route("/events/{id}", get(events::get_one::<S>))
    // Occupancy
    .route("/occupancy", get(occupancy::snapshot::<S>))
    .route("/occupancy/inside", get(occupancy::inside::<S>))
    .route("/anomalies", get(occupancy::anomalies::<S>))
    // Audit trail
    .route("/sync-attempts", get(audit::list::<S>))
    // Health
    .route("/health", get(health::handler::<S>))
    .with_state(state)
}
