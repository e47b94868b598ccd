//! Batch submissions from capture devices.
//!
//! A batch is validated as a whole: one bad record rejects every record, so a
//! batch is never partially applied. Validation also normalizes subject
//! fields the same way the capture form does.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  event::{EntityKind, Event, EventId, PersonCategory},
};

/// Largest number of events accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 500;

/// Wire shape of a device submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
  /// The submitting device. Optional; defaults to the first event's device.
  #[serde(default)]
  pub device_id: Option<String>,
  pub events:    Vec<Event>,
}

/// A batch that passed [`Batch::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
  events: Vec<Event>,
}

impl ValidatedBatch {
  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn events(&self) -> &[Event] { &self.events }

  pub fn into_events(self) -> Vec<Event> { self.events }
}

/// Response to a device: every id now durably stored, including ids that
/// were already present from an earlier attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
  pub confirmed: Vec<EventId>,
}

impl Batch {
  /// The device identity the batch claims: the explicit `device_id`, or the
  /// first event's device when absent. Only this value is checked against a
  /// device credential; records are not required to agree with it.
  pub fn declared_device(&self) -> Option<&str> {
    self
      .device_id
      .as_deref()
      .map(str::trim)
      .filter(|d| !d.is_empty())
      .or_else(|| {
        self
          .events
          .first()
          .map(|e| e.device_id.trim())
          .filter(|d| !d.is_empty())
      })
  }

  pub fn validate(self) -> Result<ValidatedBatch> {
    if self.events.is_empty() {
      return Err(Error::EmptyBatch);
    }
    if self.events.len() > MAX_BATCH_SIZE {
      return Err(Error::BatchTooLarge {
        got: self.events.len(),
        max: MAX_BATCH_SIZE,
      });
    }

    let events = self
      .events
      .into_iter()
      .enumerate()
      .map(|(index, event)| {
        validate_event(event).map_err(|reason| Error::InvalidEvent {
          index,
          reason: reason.to_owned(),
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedBatch { events })
  }
}

fn validate_event(mut event: Event) -> Result<Event, &'static str> {
  event.device_id = event.device_id.trim().to_owned();
  if event.device_id.is_empty() {
    return Err("device_id is required");
  }

  event.subject = event.subject.normalized();
  if event.entity_kind == EntityKind::Vehicle && event.subject.plate.is_none() {
    return Err("vehicles require a plate");
  }
  if event.category == PersonCategory::Employee
    && event.subject.employee_number.is_none()
  {
    return Err("employees require an employee number");
  }

  Ok(event)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::event::Direction;

  fn event(id: &str, kind: EntityKind, category: PersonCategory) -> Event {
    Event::new(
      EventId::new(id).unwrap(),
      Direction::Entry,
      kind,
      category,
      Utc::now(),
      "TABLET-01",
    )
  }

  #[test]
  fn empty_batch_is_rejected() {
    let batch = Batch { device_id: None, events: vec![] };
    assert!(matches!(batch.validate(), Err(Error::EmptyBatch)));
  }

  #[test]
  fn oversized_batch_is_rejected() {
    let events = (0..=MAX_BATCH_SIZE)
      .map(|i| event(&i.to_string(), EntityKind::Pedestrian, PersonCategory::Visitor))
      .collect();
    let batch = Batch { device_id: None, events };
    assert!(matches!(batch.validate(), Err(Error::BatchTooLarge { .. })));
  }

  #[test]
  fn one_bad_record_rejects_the_batch() {
    let good = event("a", EntityKind::Pedestrian, PersonCategory::Visitor);
    let bad = event("b", EntityKind::Vehicle, PersonCategory::Visitor);
    let batch = Batch { device_id: None, events: vec![good, bad] };
    match batch.validate() {
      Err(Error::InvalidEvent { index, reason }) => {
        assert_eq!(index, 1);
        assert!(reason.contains("plate"), "{reason}");
      }
      other => panic!("expected InvalidEvent, got {other:?}"),
    }
  }

  #[test]
  fn employees_need_a_number() {
    let mut e = event("a", EntityKind::Pedestrian, PersonCategory::Employee);
    e.subject.employee_number = Some("   ".into());
    let batch = Batch { device_id: None, events: vec![e] };
    assert!(batch.validate().is_err());
  }

  #[test]
  fn blank_device_is_rejected() {
    let mut e = event("a", EntityKind::Pedestrian, PersonCategory::Visitor);
    e.device_id = "  ".into();
    let batch = Batch { device_id: None, events: vec![e] };
    assert!(batch.validate().is_err());
  }

  #[test]
  fn validation_normalizes_fields() {
    let mut e = event("a", EntityKind::Vehicle, PersonCategory::Visitor);
    e.subject.plate = Some(" abc123 ".into());
    e.subject.name = Some("".into());
    let batch = Batch { device_id: None, events: vec![e] };
    let validated = batch.validate().unwrap();
    let stored = &validated.events()[0];
    assert_eq!(stored.subject.plate.as_deref(), Some("ABC123"));
    assert_eq!(stored.subject.name, None);
  }

  #[test]
  fn declared_device_falls_back_to_first_event() {
    let e = event("a", EntityKind::Pedestrian, PersonCategory::Visitor);
    let mut batch = Batch { device_id: None, events: vec![e] };
    assert_eq!(batch.declared_device(), Some("TABLET-01"));
    batch.device_id = Some("TABLET-07".into());
    assert_eq!(batch.declared_device(), Some("TABLET-07"));
    batch.device_id = Some(" ".into());
    assert_eq!(batch.declared_device(), Some("TABLET-01"));
  }
}
