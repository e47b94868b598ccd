//! Occupancy: who is inside, reconstructed from the raw event log.
//!
//! The rule is "last event per identity wins": an identity is inside iff its
//! most recent event (by `occurred_at`, ties broken by the greater id) is an
//! entry. Stores evaluate this in their query language; [`Presence`] is the
//! in-memory form of the same rule, used by the capture tool against its
//! local queue.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  event::{Direction, Event, StoredEvent},
  identity::IdentityKey,
  query::TimeRange,
  zone::ReferenceZone,
};

/// A device counts as active if it captured something this recently.
pub const ACTIVE_DEVICE_WINDOW_MINUTES: i64 = 15;

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// The time bounds an occupancy snapshot is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyWindow {
  pub as_of:        DateTime<Utc>,
  /// The current reference day.
  pub today:        TimeRange,
  /// Lower bound for the active-device count.
  pub active_since: DateTime<Utc>,
}

impl OccupancyWindow {
  pub fn at(now: DateTime<Utc>, zone: &ReferenceZone) -> Result<Self> {
    Ok(Self {
      as_of:        now,
      today:        zone.today(now)?,
      active_since: now - TimeDelta::minutes(ACTIVE_DEVICE_WINDOW_MINUTES),
    })
  }
}

/// Counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
  /// Identities whose latest event is an entry.
  pub inside_count:              u64,
  pub entries_today:             u64,
  pub exits_today:               u64,
  /// Exits flagged by the device as having no matching entry.
  pub exits_without_entry_today: u64,
  pub active_devices:            u64,
  pub as_of:                     DateTime<Utc>,
}

/// One identity currently inside, with the entry that put it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsideEntry {
  pub identity_key: IdentityKey,
  #[serde(flatten)]
  pub event:        StoredEvent,
}

// ─── In-memory reconstruction ────────────────────────────────────────────────

/// Latest event per identity over some set of events.
#[derive(Debug, Default)]
pub struct Presence<'a> {
  latest: BTreeMap<IdentityKey, &'a Event>,
}

impl<'a> Presence<'a> {
  /// Group `events` by identity key, keeping the latest per key. Events
  /// without a key are ignored.
  pub fn reconstruct<I>(events: I) -> Self
  where
    I: IntoIterator<Item = &'a Event>,
  {
    let mut latest: BTreeMap<IdentityKey, &'a Event> = BTreeMap::new();
    for event in events {
      let Some(key) = event.identity_key() else { continue };
      latest
        .entry(key)
        .and_modify(|current| {
          if is_later(event, *current) {
            *current = event;
          }
        })
        .or_insert(event);
    }
    Self { latest }
  }

  pub fn latest(&self, key: &IdentityKey) -> Option<&'a Event> {
    self.latest.get(key).copied()
  }

  pub fn is_inside(&self, key: &IdentityKey) -> bool {
    self
      .latest(key)
      .is_some_and(|event| event.direction == Direction::Entry)
  }

  /// Identities inside, most recent entry first.
  pub fn inside(&self) -> Vec<(&IdentityKey, &'a Event)> {
    let mut inside: Vec<_> = self
      .latest
      .iter()
      .filter(|(_, event)| event.direction == Direction::Entry)
      .map(|(key, event)| (key, *event))
      .collect();
    inside.sort_by(|(_, a), (_, b)| {
      (b.occurred_at, &b.id).cmp(&(a.occurred_at, &a.id))
    });
    inside
  }

  pub fn inside_count(&self) -> usize {
    self
      .latest
      .values()
      .filter(|event| event.direction == Direction::Entry)
      .count()
  }
}

fn is_later(candidate: &Event, current: &Event) -> bool {
  (candidate.occurred_at, &candidate.id) > (current.occurred_at, &current.id)
}
