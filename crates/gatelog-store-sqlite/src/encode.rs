//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings at chrono's full
//! nanosecond precision (`2025-01-15T16:04:05.000000000Z`), so comparing the
//! strings compares the instants and a decoded value equals the one written. Enums are stored as their snake_case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use gatelog_core::{
  audit::SyncAttempt,
  device::Device,
  event::{Event, EventId, StoredEvent, SubjectFields},
  identity::IdentityKey,
  occupancy::InsideEntry,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Corrupt { column, value: s.to_owned() })
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// SQLite integers are `i64`; counts never go negative.
pub fn decode_count(column: &'static str, n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Corrupt { column, value: n.to_string() })
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, direction, entity_kind, category,
  name, employee_number, company, area, purpose,
  plate, vehicle_model, vehicle_color, scanned_code,
  occurred_at, device_id, exit_without_entry, received_at, updated_at";

/// Number of columns in [`EVENT_COLUMNS`].
pub const EVENT_COLUMN_COUNT: usize = 18;

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:           String,
  pub direction:          String,
  pub entity_kind:        String,
  pub category:           String,
  pub name:               Option<String>,
  pub employee_number:    Option<String>,
  pub company:            Option<String>,
  pub area:               Option<String>,
  pub purpose:            Option<String>,
  pub plate:              Option<String>,
  pub vehicle_model:      Option<String>,
  pub vehicle_color:      Option<String>,
  pub scanned_code:       Option<String>,
  pub occurred_at:        String,
  pub device_id:          String,
  pub exit_without_entry: bool,
  pub received_at:        String,
  pub updated_at:         String,
}

impl RawEvent {
  /// Read the [`EVENT_COLUMNS`] starting at column 0.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:           row.get(0)?,
      direction:          row.get(1)?,
      entity_kind:        row.get(2)?,
      category:           row.get(3)?,
      name:               row.get(4)?,
      employee_number:    row.get(5)?,
      company:            row.get(6)?,
      area:               row.get(7)?,
      purpose:            row.get(8)?,
      plate:              row.get(9)?,
      vehicle_model:      row.get(10)?,
      vehicle_color:      row.get(11)?,
      scanned_code:       row.get(12)?,
      occurred_at:        row.get(13)?,
      device_id:          row.get(14)?,
      exit_without_entry: row.get(15)?,
      received_at:        row.get(16)?,
      updated_at:         row.get(17)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredEvent> {
    let event = Event {
      id:                 EventId::new(self.event_id)?,
      direction:          decode_enum("direction", &self.direction)?,
      entity_kind:        decode_enum("entity_kind", &self.entity_kind)?,
      category:           decode_enum("category", &self.category)?,
      subject:            SubjectFields {
        name:            self.name,
        employee_number: self.employee_number,
        company:         self.company,
        area:            self.area,
        purpose:         self.purpose,
        plate:           self.plate,
        vehicle_model:   self.vehicle_model,
        vehicle_color:   self.vehicle_color,
        scanned_code:    self.scanned_code,
      },
      occurred_at:        decode_dt(&self.occurred_at)?,
      device_id:          self.device_id,
      exit_without_entry: self.exit_without_entry,
    };

    Ok(StoredEvent {
      event,
      received_at: decode_dt(&self.received_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// An `events` row plus the identity key computed by the query.
pub struct RawInsideEntry {
  pub event:        RawEvent,
  pub identity_key: String,
}

impl RawInsideEntry {
  pub fn into_entry(self) -> Result<InsideEntry> {
    let identity_key: IdentityKey = self.identity_key.parse()?;
    Ok(InsideEntry { identity_key, event: self.event.into_stored()? })
  }
}

// ─── Sync attempts ───────────────────────────────────────────────────────────

/// Raw values read directly from a `sync_attempts` row.
pub struct RawSyncAttempt {
  pub attempt_id:      String,
  pub device_id:       Option<String>,
  pub received_count:  i64,
  pub confirmed_count: i64,
  pub remote_addr:     Option<String>,
  pub user_agent:      Option<String>,
  pub error:           Option<String>,
  pub created_at:      String,
}

impl RawSyncAttempt {
  pub fn into_attempt(self) -> Result<SyncAttempt> {
    Ok(SyncAttempt {
      attempt_id:      Uuid::parse_str(&self.attempt_id)?,
      device_id:       self.device_id,
      received_count:  decode_count("received_count", self.received_count)?,
      confirmed_count: decode_count("confirmed_count", self.confirmed_count)?,
      remote_addr:     self.remote_addr,
      user_agent:      self.user_agent,
      error:           self.error,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

// ─── Devices ─────────────────────────────────────────────────────────────────

/// Raw values read directly from a `devices` row (without the key hash).
pub struct RawDevice {
  pub device_id:    String,
  pub active:       bool,
  pub created_at:   String,
  pub last_seen_at: Option<String>,
}

impl RawDevice {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      device_id:    row.get(0)?,
      active:       row.get(1)?,
      created_at:   row.get(2)?,
      last_seen_at: row.get(3)?,
    })
  }

  pub fn into_device(self) -> Result<Device> {
    Ok(Device {
      device_id:    self.device_id,
      active:       self.active,
      created_at:   decode_dt(&self.created_at)?,
      last_seen_at: self.last_seen_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
