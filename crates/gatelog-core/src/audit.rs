//! The ingestion audit trail.
//!
//! Every batch attempt, accepted or not, is appended here. Writing the trail
//! is best-effort: it never changes what the device is told.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input to [`crate::store::EventStore::record_sync_attempt`].
/// `attempt_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSyncAttempt {
  /// Unknown when the body could not be parsed.
  pub device_id:       Option<String>,
  pub received_count:  u32,
  pub confirmed_count: u32,
  pub remote_addr:     Option<String>,
  pub user_agent:      Option<String>,
  /// Why the attempt failed, if it did.
  pub error:           Option<String>,
}

/// One recorded batch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttempt {
  pub attempt_id:      Uuid,
  pub device_id:       Option<String>,
  pub received_count:  u32,
  pub confirmed_count: u32,
  pub remote_addr:     Option<String>,
  pub user_agent:      Option<String>,
  pub error:           Option<String>,
  pub created_at:      DateTime<Utc>,
}

/// Parameters for [`crate::store::EventStore::list_sync_attempts`].
#[derive(Debug, Clone, Default)]
pub struct SyncAttemptFilter {
  pub device_id:   Option<String>,
  /// Only attempts that recorded an error.
  pub errors_only: bool,
}
