//! Event types: the fundamental unit of the gate logbook.
//!
//! An event is one observed movement through a gate. Events are keyed by an
//! identifier the capturing device generates, so a device can resend the same
//! event any number of times without creating duplicates.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, identity::IdentityKey};

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Client-generated idempotency key of an event.
///
/// Any non-empty string of at most [`EventId::MAX_LEN`] characters without
/// whitespace or control characters. The capture tool uses UUID v4 strings.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
  pub const MAX_LEN: usize = 128;

  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    let valid = !id.is_empty()
      && id.chars().count() <= Self::MAX_LEN
      && id.chars().all(|c| !c.is_whitespace() && !c.is_control());
    if valid { Ok(Self(id)) } else { Err(Error::InvalidEventId(id)) }
  }

  /// A fresh random identifier, as generated on capture.
  pub fn generate() -> Self { Self(Uuid::new_v4().hyphenated().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for EventId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<EventId> for String {
  fn from(id: EventId) -> Self { id.0 }
}

impl FromStr for EventId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Whether the subject came in or went out.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
  Entry,
  Exit,
}

/// What physically crossed the gate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Pedestrian,
  Vehicle,
}

/// The relationship of the person to the facility.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonCategory {
  Employee,
  Supplier,
  Visitor,
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// Descriptive attributes of whoever (or whatever) crossed the gate.
///
/// Which fields are populated depends on the entity kind and category, but
/// nothing here is mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectFields {
  pub name:            Option<String>,
  pub employee_number: Option<String>,
  pub company:         Option<String>,
  /// Destination area inside the facility (warehouse, dock, office...).
  pub area:            Option<String>,
  pub purpose:         Option<String>,
  pub plate:           Option<String>,
  pub vehicle_model:   Option<String>,
  pub vehicle_color:   Option<String>,
  /// Raw payload of a scanned badge or QR code.
  pub scanned_code:    Option<String>,
}

impl SubjectFields {
  /// Trim every field, drop the ones left empty, and uppercase the plate.
  pub fn normalized(self) -> Self {
    Self {
      name:            clean(self.name),
      employee_number: clean(self.employee_number),
      company:         clean(self.company),
      area:            clean(self.area),
      purpose:         clean(self.purpose),
      plate:           clean(self.plate).map(|p| p.to_uppercase()),
      vehicle_model:   clean(self.vehicle_model),
      vehicle_color:   clean(self.vehicle_color),
      scanned_code:    clean(self.scanned_code),
    }
  }

  /// Fill every absent field from `other`, leaving present ones untouched.
  pub fn fill_from(&mut self, other: &SubjectFields) {
    fn fill(slot: &mut Option<String>, from: &Option<String>) {
      if slot.is_none() {
        slot.clone_from(from);
      }
    }
    fill(&mut self.name, &other.name);
    fill(&mut self.employee_number, &other.employee_number);
    fill(&mut self.company, &other.company);
    fill(&mut self.area, &other.area);
    fill(&mut self.purpose, &other.purpose);
    fill(&mut self.plate, &other.plate);
    fill(&mut self.vehicle_model, &other.vehicle_model);
    fill(&mut self.vehicle_color, &other.vehicle_color);
    fill(&mut self.scanned_code, &other.scanned_code);
  }
}

fn clean(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// `true` when the field is absent or only whitespace.
pub fn is_blank(value: Option<&str>) -> bool {
  value.is_none_or(|v| v.trim().is_empty())
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One recorded movement, as submitted by a capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:                 EventId,
  pub direction:          Direction,
  pub entity_kind:        EntityKind,
  pub category:           PersonCategory,
  #[serde(flatten)]
  pub subject:            SubjectFields,
  /// When the movement happened according to the device. Authoritative for
  /// ordering; server receipt time plays no part.
  pub occurred_at:        DateTime<Utc>,
  pub device_id:          String,
  /// Set by the device when an exit matched no open entry it knew about.
  /// Stored verbatim.
  #[serde(default)]
  pub exit_without_entry: bool,
}

impl Event {
  /// Convenience constructor with every subject field absent.
  pub fn new(
    id: EventId,
    direction: Direction,
    entity_kind: EntityKind,
    category: PersonCategory,
    occurred_at: DateTime<Utc>,
    device_id: impl Into<String>,
  ) -> Self {
    Self {
      id,
      direction,
      entity_kind,
      category,
      subject: SubjectFields::default(),
      occurred_at,
      device_id: device_id.into(),
      exit_without_entry: false,
    }
  }

  /// The grouping key used for occupancy, if one can be derived.
  pub fn identity_key(&self) -> Option<IdentityKey> {
    IdentityKey::derive(
      self.subject.plate.as_deref(),
      self.category,
      self.subject.employee_number.as_deref(),
      self.subject.scanned_code.as_deref(),
    )
  }
}

/// An event as held by the server, with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
  #[serde(flatten)]
  pub event:       Event,
  /// When the server first stored this id.
  pub received_at: DateTime<Utc>,
  /// When the row was last written by an upsert.
  pub updated_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn event_id_rules() {
    assert!(EventId::new("a").is_ok());
    assert!(EventId::new(Uuid::new_v4().to_string()).is_ok());
    assert!(EventId::new("").is_err());
    assert!(EventId::new(" a").is_err());
    assert!(EventId::new("a\nb").is_err());
    assert!(EventId::new("x".repeat(EventId::MAX_LEN)).is_ok());
    assert!(EventId::new("x".repeat(EventId::MAX_LEN + 1)).is_err());
  }

  #[test]
  fn enums_use_snake_case_everywhere() {
    assert_eq!(Direction::Entry.as_ref(), "entry");
    assert_eq!(
      serde_json::to_string(&PersonCategory::Employee).unwrap(),
      "\"employee\""
    );
    assert_eq!("vehicle".parse::<EntityKind>().unwrap(), EntityKind::Vehicle);
    assert!("VEHICLE".parse::<EntityKind>().is_err());
  }

  #[test]
  fn normalization_trims_and_uppercases_plate() {
    let fields = SubjectFields {
      name: Some("  Ana  ".into()),
      company: Some("   ".into()),
      plate: Some(" abc-123 ".into()),
      ..Default::default()
    }
    .normalized();

    assert_eq!(fields.name.as_deref(), Some("Ana"));
    assert_eq!(fields.company, None);
    assert_eq!(fields.plate.as_deref(), Some("ABC-123"));
  }

  #[test]
  fn fill_from_keeps_present_values() {
    let mut fields = SubjectFields {
      name: Some("Ana".into()),
      ..Default::default()
    };
    let previous = SubjectFields {
      name: Some("Someone else".into()),
      company: Some("ACME".into()),
      ..Default::default()
    };
    fields.fill_from(&previous);
    assert_eq!(fields.name.as_deref(), Some("Ana"));
    assert_eq!(fields.company.as_deref(), Some("ACME"));
  }

  #[test]
  fn wire_format_is_flat() {
    let json = serde_json::json!({
      "id": "a",
      "direction": "entry",
      "entity_kind": "vehicle",
      "category": "visitor",
      "plate": "ABC123",
      "occurred_at": "2025-03-01T10:00:00-07:00",
      "device_id": "TABLET-01"
    });
    let event: Event = serde_json::from_value(json).unwrap();
    assert_eq!(event.subject.plate.as_deref(), Some("ABC123"));
    assert!(!event.exit_without_entry);
    assert_eq!(event.occurred_at.to_rfc3339(), "2025-03-01T17:00:00+00:00");
  }

  #[test]
  fn invalid_id_fails_deserialization() {
    let json = serde_json::json!({
      "id": "",
      "direction": "entry",
      "entity_kind": "pedestrian",
      "category": "visitor",
      "occurred_at": "2025-03-01T10:00:00Z",
      "device_id": "TABLET-01"
    });
    assert!(serde_json::from_value::<Event>(json).is_err());
  }
}
