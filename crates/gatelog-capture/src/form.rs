//! The guard's capture form: validation, auto-fill and the duplicate-entry
//! check that happen before a record reaches the queue.

use chrono::{DateTime, Utc};
use gatelog_core::{
  event::{Direction, EntityKind, Event, EventId, PersonCategory, SubjectFields},
  identity::IdentityKey,
  occupancy::Presence,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
  #[error("{0} is required")]
  Missing(&'static str),

  /// The identity's latest local record is already an entry.
  #[error("{key} is already inside since {since}; pass --force to record anyway")]
  AlreadyInside {
    key:   IdentityKey,
    since: DateTime<Utc>,
  },
}

/// What the guard typed in.
#[derive(Debug, Clone)]
pub struct Form {
  pub direction:   Direction,
  pub entity_kind: EntityKind,
  pub category:    PersonCategory,
  pub subject:     SubjectFields,
  /// Record an entry even if the identity looks already inside.
  pub force:       bool,
}

impl Form {
  fn normalized_subject(&self) -> SubjectFields {
    let mut subject = self.subject.clone().normalized();
    if self.entity_kind == EntityKind::Pedestrian {
      subject.plate = None;
      subject.vehicle_model = None;
      subject.vehicle_color = None;
    }
    subject
  }

  /// The identity key the finished record will carry, before auto-fill.
  pub fn identity_key(&self) -> Option<IdentityKey> {
    let subject = self.normalized_subject();
    IdentityKey::derive(
      subject.plate.as_deref(),
      self.category,
      subject.employee_number.as_deref(),
      subject.scanned_code.as_deref(),
    )
  }

  /// Turn the form into an event ready to queue.
  ///
  /// `related` must hold the local records that may share this form's
  /// identity key (see [`crate::queue::Queue::related`]); anything else in it
  /// is ignored.
  pub fn into_event(
    self,
    related: &[Event],
    device_id: &str,
    now: DateTime<Utc>,
  ) -> Result<Event, FormError> {
    let mut subject = self.normalized_subject();
    let key = self.identity_key();

    let presence = Presence::reconstruct(related);
    let latest = key.as_ref().and_then(|k| presence.latest(k));

    if let Some(previous) = latest {
      subject.fill_from(&previous.subject);
      if self.entity_kind == EntityKind::Pedestrian {
        subject.plate = None;
        subject.vehicle_model = None;
        subject.vehicle_color = None;
      }
    }

    require(&subject.name, "name")?;
    require(&subject.area, "area")?;
    require(&subject.purpose, "purpose")?;
    if self.category == PersonCategory::Employee {
      require(&subject.employee_number, "employee number")?;
    }
    if self.entity_kind == EntityKind::Vehicle {
      require(&subject.plate, "plate")?;
    }

    let previous_entry = latest.filter(|e| e.direction == Direction::Entry);
    if self.direction == Direction::Entry
      && !self.force
      && let (Some(key), Some(previous)) = (key, previous_entry)
    {
      return Err(FormError::AlreadyInside {
        key,
        since: previous.occurred_at,
      });
    }

    let mut event = Event::new(
      EventId::generate(),
      self.direction,
      self.entity_kind,
      self.category,
      now,
      device_id,
    );
    event.subject = subject;
    event.exit_without_entry =
      self.direction == Direction::Exit && previous_entry.is_none();
    Ok(event)
  }
}

fn require(value: &Option<String>, field: &'static str) -> Result<(), FormError> {
  match value {
    Some(_) => Ok(()),
    None => Err(FormError::Missing(field)),
  }
}
