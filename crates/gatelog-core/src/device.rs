//! Capture devices known to the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered capture device. Its API key is held only as a hash by the
/// store and never leaves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
  pub device_id:    String,
  pub active:       bool,
  pub created_at:   DateTime<Utc>,
  pub last_seen_at: Option<DateTime<Utc>>,
}
