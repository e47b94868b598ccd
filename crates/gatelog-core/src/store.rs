//! The `EventStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `gatelog-store-sqlite`).
//! The API and the server binary depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  audit::{NewSyncAttempt, SyncAttempt, SyncAttemptFilter},
  device::Device,
  event::{Event, EventId, StoredEvent},
  occupancy::{InsideEntry, OccupancySnapshot, OccupancyWindow},
  query::{Page, PageRequest, ResolvedFilter},
};

/// Abstraction over the event log and its side tables.
///
/// Event writes are idempotent upserts keyed by the client-supplied id.
/// Reads never return partial results: a failing query is an error.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Event log: writes ──────────────────────────────────────────────────

  /// Insert `event`, or overwrite every mutable field of the row with the
  /// same id. Never fails because the id already exists.
  fn upsert(
    &self,
    event: Event,
  ) -> impl Future<Output = Result<EventId, Self::Error>> + Send + '_;

  /// Upsert every event in one transaction. Either all rows become visible
  /// or none do. Returns the ids of the batch, deduplicated, in first-seen
  /// order.
  fn upsert_batch(
    &self,
    events: Vec<Event>,
  ) -> impl Future<Output = Result<Vec<EventId>, Self::Error>> + Send + '_;

  // ── Event log: reads ───────────────────────────────────────────────────

  fn get_event<'a>(
    &'a self,
    id: &'a EventId,
  ) -> impl Future<Output = Result<Option<StoredEvent>, Self::Error>> + Send + 'a;

  /// Filtered listing, newest `occurred_at` first.
  fn query<'a>(
    &'a self,
    filter: &'a ResolvedFilter,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<StoredEvent>, Self::Error>> + Send + 'a;

  /// Same filter and order as [`EventStore::query`], unpaginated but capped
  /// at [`crate::query::EXPORT_ROW_CAP`] rows.
  fn query_for_export<'a>(
    &'a self,
    filter: &'a ResolvedFilter,
  ) -> impl Future<Output = Result<Vec<StoredEvent>, Self::Error>> + Send + 'a;

  // ── Occupancy ───────────────────────────────────────────────────────────

  /// Counters for the dashboard, computed against `window`.
  fn occupancy(
    &self,
    window: OccupancyWindow,
  ) -> impl Future<Output = Result<OccupancySnapshot, Self::Error>> + Send + '_;

  /// Identities currently inside with their latest entry, most recent first.
  fn inside(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<InsideEntry>, Self::Error>> + Send + '_;

  // ── Audit trail ─────────────────────────────────────────────────────────

  fn record_sync_attempt(
    &self,
    attempt: NewSyncAttempt,
  ) -> impl Future<Output = Result<SyncAttempt, Self::Error>> + Send + '_;

  fn list_sync_attempts<'a>(
    &'a self,
    filter: &'a SyncAttemptFilter,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<SyncAttempt>, Self::Error>> + Send + 'a;

  // ── Devices ─────────────────────────────────────────────────────────────

  /// Register a device with the hash of its API key. Re-registering an
  /// existing device replaces its key and reactivates it.
  fn register_device(
    &self,
    device_id: String,
    key_hash: String,
  ) -> impl Future<Output = Result<Device, Self::Error>> + Send + '_;

  /// Mark a device inactive. Returns `false` if no such device exists.
  fn deactivate_device(
    &self,
    device_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Look up the device holding the key with this hash, active or not.
  fn find_device_by_key_hash(
    &self,
    key_hash: String,
  ) -> impl Future<Output = Result<Option<Device>, Self::Error>> + Send + '_;

  /// Record that a device was just seen.
  fn touch_device(
    &self,
    device_id: String,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Health ──────────────────────────────────────────────────────────────

  /// Cheap round-trip to the backing store.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
