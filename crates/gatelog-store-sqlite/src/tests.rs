//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use gatelog_core::{
  audit::{NewSyncAttempt, SyncAttemptFilter},
  event::{Direction, EntityKind, Event, EventId, PersonCategory},
  identity::IdentityKey,
  occupancy::{OccupancyWindow, Presence},
  query::{EXPORT_ROW_CAP, EventFilter, PageRequest, ResolvedFilter, TimeRange},
  store::EventStore,
  zone::ReferenceZone,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn id(s: &str) -> EventId { EventId::new(s).unwrap() }

fn utc(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// 2025-01-15 16:00 UTC plus `minutes`.
fn at(minutes: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 15, 16, 0, 0).unwrap() + TimeDelta::minutes(minutes)
}

fn pedestrian(event_id: &str, direction: Direction, minutes: i64) -> Event {
  let mut e = Event::new(
    id(event_id),
    direction,
    EntityKind::Pedestrian,
    PersonCategory::Visitor,
    at(minutes),
    "TABLET-01",
  );
  e.subject.name = Some("Ana Lopez".into());
  e
}

fn vehicle(event_id: &str, direction: Direction, plate: &str, minutes: i64) -> Event {
  let mut e = Event::new(
    id(event_id),
    direction,
    EntityKind::Vehicle,
    PersonCategory::Supplier,
    at(minutes),
    "TABLET-01",
  );
  e.subject.plate = Some(plate.into());
  e
}

fn employee(event_id: &str, direction: Direction, number: &str, minutes: i64) -> Event {
  let mut e = Event::new(
    id(event_id),
    direction,
    EntityKind::Pedestrian,
    PersonCategory::Employee,
    at(minutes),
    "TABLET-02",
  );
  e.subject.employee_number = Some(number.into());
  e
}

fn window(now: DateTime<Utc>) -> OccupancyWindow {
  OccupancyWindow::at(now, &ReferenceZone::default()).unwrap()
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_then_get() {
  let s = store().await;
  let event = vehicle("a", Direction::Entry, "ABC123", 0);

  let returned = s.upsert(event.clone()).await.unwrap();
  assert_eq!(returned, id("a"));

  let stored = s.get_event(&id("a")).await.unwrap().expect("stored");
  assert_eq!(stored.event, event);
  assert_eq!(stored.received_at, stored.updated_at);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get_event(&id("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn resubmission_is_last_writer_wins() {
  let s = store().await;
  let mut first = pedestrian("a", Direction::Entry, 0);
  first.subject.name = Some("Ana".into());
  s.upsert_batch(vec![first]).await.unwrap();

  // The second write carries an earlier timestamp; it still wins.
  let mut second = pedestrian("a", Direction::Entry, -30);
  second.subject.name = Some("Ana Maria".into());
  second.subject.company = None;
  let confirmed = s.upsert_batch(vec![second.clone()]).await.unwrap();
  assert_eq!(confirmed, vec![id("a")]);

  let page = s.query(&ResolvedFilter::default(), PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 1);
  let stored = &page.items[0];
  assert_eq!(stored.event, second);
  assert!(stored.updated_at >= stored.received_at);
}

#[tokio::test]
async fn confirmation_covers_already_present_ids() {
  let s = store().await;
  s.upsert_batch(vec![pedestrian("a", Direction::Entry, 0)]).await.unwrap();

  let confirmed = s
    .upsert_batch(vec![
      pedestrian("b", Direction::Entry, 1),
      pedestrian("a", Direction::Entry, 0),
      pedestrian("b", Direction::Exit, 2),
    ])
    .await
    .unwrap();

  assert_eq!(confirmed, vec![id("b"), id("a")]);
  // The later duplicate inside the batch is the one kept.
  let b = s.get_event(&id("b")).await.unwrap().unwrap();
  assert_eq!(b.event.direction, Direction::Exit);
}

#[tokio::test]
async fn reopening_a_file_keeps_events() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("gatelog.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.upsert(pedestrian("a", Direction::Entry, 0)).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get_event(&id("a")).await.unwrap().is_some());
}

#[tokio::test]
async fn write_failure_mid_batch_rolls_back_everything() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("gatelog.db");
  let s = SqliteStore::open(&path).await.unwrap();

  // Fail the insert of the second record from inside the database.
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn
      .execute_batch(
        "CREATE TRIGGER refuse_b BEFORE INSERT ON events
         WHEN NEW.event_id = 'b'
         BEGIN SELECT RAISE(ABORT, 'disk says no'); END;",
      )
      .unwrap();
  }

  let result = s
    .upsert_batch(vec![
      pedestrian("a", Direction::Entry, 0),
      pedestrian("b", Direction::Entry, 1),
      pedestrian("c", Direction::Entry, 2),
    ])
    .await;
  assert!(result.is_err());

  let page = s.query(&ResolvedFilter::default(), PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 0);
  assert!(s.get_event(&id("a")).await.unwrap().is_none());
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_orders_newest_first_with_id_tiebreak() {
  let s = store().await;
  s.upsert_batch(vec![
    pedestrian("a", Direction::Entry, 0),
    pedestrian("c", Direction::Entry, 5),
    pedestrian("b", Direction::Entry, 5),
  ])
  .await
  .unwrap();

  let page = s.query(&ResolvedFilter::default(), PageRequest::default()).await.unwrap();
  let ids: Vec<&str> = page.items.iter().map(|e| e.event.id.as_str()).collect();
  assert_eq!(ids, ["c", "b", "a"]);
}

#[tokio::test]
async fn query_paginates_and_reports_total() {
  let s = store().await;
  let events = (0..7)
    .map(|i| pedestrian(&format!("e{i}"), Direction::Entry, i))
    .collect();
  s.upsert_batch(events).await.unwrap();

  let page = s
    .query(&ResolvedFilter::default(), PageRequest::new(Some(3), Some(3)))
    .await
    .unwrap();
  assert_eq!(page.total, 7);
  assert_eq!((page.limit, page.offset), (3, 3));
  let ids: Vec<&str> = page.items.iter().map(|e| e.event.id.as_str()).collect();
  assert_eq!(ids, ["e3", "e2", "e1"]);
}

#[tokio::test]
async fn oversized_limit_is_clamped() {
  let s = store().await;
  let events = (0..250)
    .map(|i| pedestrian(&format!("e{i:03}"), Direction::Entry, i))
    .collect();
  s.upsert_batch(events).await.unwrap();

  let page = s
    .query(&ResolvedFilter::default(), PageRequest::new(Some(10_000), None))
    .await
    .unwrap();
  assert_eq!(page.total, 250);
  assert_eq!(page.items.len(), 200);
}

#[tokio::test]
async fn text_search_is_case_insensitive_and_literal() {
  let s = store().await;
  let mut a = pedestrian("a", Direction::Entry, 0);
  a.subject.company = Some("ACME 100% Steel".into());
  let mut b = pedestrian("b", Direction::Entry, 1);
  b.subject.company = Some("ACME 1000 Steel".into());
  b.subject.name = Some("Bruno".into());
  s.upsert_batch(vec![a, b, vehicle("c", Direction::Entry, "XYZ9", 2)])
    .await
    .unwrap();

  let search = |text: &str| ResolvedFilter {
    text: Some(text.into()),
    ..ResolvedFilter::default()
  };

  let page = s.query(&search("acme"), PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 2);

  let page = s.query(&search("100%"), PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].event.id, id("a"));

  let page = s.query(&search("xyz"), PageRequest::default()).await.unwrap();
  assert_eq!(page.items[0].event.id, id("c"));

  let page = s.query(&search("tablet-01"), PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 3);
}

#[tokio::test]
async fn text_search_ignores_case_and_accents() {
  let s = store().await;
  let mut a = pedestrian("a", Direction::Entry, 0);
  a.subject.name = Some("JOSÉ ÁNGEL NUÑEZ".into());
  let mut b = pedestrian("b", Direction::Entry, 1);
  b.subject.name = Some("María Peña".into());
  s.upsert_batch(vec![a, b]).await.unwrap();

  let total = |text: &'static str| {
    let s = s.clone();
    async move {
      let filter = ResolvedFilter {
        text: Some(text.into()),
        ..ResolvedFilter::default()
      };
      s.query(&filter, PageRequest::default()).await.unwrap().total
    }
  };

  assert_eq!(total("JOSÉ").await, 1);
  assert_eq!(total("josé").await, 1);
  assert_eq!(total("nunez").await, 1);
  assert_eq!(total("Ñúñez").await, 1);
  assert_eq!(total("MARIA PEÑA").await, 1);
  assert_eq!(total("pena").await, 1);
  assert_eq!(total("ángela").await, 0);
}

#[tokio::test]
async fn structured_filters_combine() {
  let s = store().await;
  let mut dock = vehicle("a", Direction::Entry, "AAA", 0);
  dock.subject.area = Some("Dock 3".into());
  s.upsert_batch(vec![
    dock,
    vehicle("b", Direction::Exit, "AAA", 5),
    employee("c", Direction::Entry, "E7", 6),
  ])
  .await
  .unwrap();

  let filter = ResolvedFilter {
    direction: Some(Direction::Entry),
    category: Some(PersonCategory::Supplier),
    ..ResolvedFilter::default()
  };
  let page = s.query(&filter, PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].event.id, id("a"));

  let filter = ResolvedFilter {
    device_id: Some("TABLET-02".into()),
    ..ResolvedFilter::default()
  };
  assert_eq!(s.query(&filter, PageRequest::default()).await.unwrap().total, 1);

  let filter = ResolvedFilter {
    area: Some("Dock 3".into()),
    ..ResolvedFilter::default()
  };
  assert_eq!(s.query(&filter, PageRequest::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn range_is_inclusive_on_both_ends() {
  let s = store().await;
  s.upsert_batch(vec![
    pedestrian("a", Direction::Entry, 0),
    pedestrian("b", Direction::Entry, 10),
    pedestrian("c", Direction::Entry, 20),
  ])
  .await
  .unwrap();

  let filter = ResolvedFilter {
    range: TimeRange { from: Some(at(0)), to: Some(at(10)) },
    ..ResolvedFilter::default()
  };
  let page = s.query(&filter, PageRequest::default()).await.unwrap();
  let ids: Vec<&str> = page.items.iter().map(|e| e.event.id.as_str()).collect();
  assert_eq!(ids, ["b", "a"]);
}

#[tokio::test]
async fn export_is_capped() {
  let s = store().await;
  let total = EXPORT_ROW_CAP as i64 + 5;
  let events: Vec<Event> = (0..total)
    .map(|i| pedestrian(&format!("e{i:05}"), Direction::Entry, i))
    .collect();
  for chunk in events.chunks(500) {
    s.upsert_batch(chunk.to_vec()).await.unwrap();
  }

  let rows = s.query_for_export(&ResolvedFilter::default()).await.unwrap();
  assert_eq!(rows.len(), EXPORT_ROW_CAP as usize);
  // Newest first, so the five oldest fall off.
  assert_eq!(rows[0].event.id.as_str(), format!("e{:05}", total - 1));
}

// ─── Occupancy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn plate_entry_then_exit_scenario() {
  let s = store().await;
  let entry = vehicle("a", Direction::Entry, "ABC123", 0);
  assert_eq!(s.upsert_batch(vec![entry.clone()]).await.unwrap(), vec![id("a")]);

  let snapshot = s.occupancy(window(at(1))).await.unwrap();
  assert_eq!(snapshot.inside_count, 1);

  // Resending the same batch confirms again and changes nothing.
  assert_eq!(s.upsert_batch(vec![entry]).await.unwrap(), vec![id("a")]);
  assert_eq!(s.occupancy(window(at(1))).await.unwrap().inside_count, 1);

  s.upsert_batch(vec![vehicle("b", Direction::Exit, "abc123", 10)])
    .await
    .unwrap();
  let snapshot = s.occupancy(window(at(11))).await.unwrap();
  assert_eq!(snapshot.inside_count, 0);
  assert_eq!(snapshot.entries_today, 1);
  assert_eq!(snapshot.exits_today, 1);
}

#[tokio::test]
async fn entry_exit_entry_counts_as_inside() {
  let s = store().await;
  s.upsert_batch(vec![
    employee("1", Direction::Entry, "E7", 0),
    employee("2", Direction::Exit, "E7", 5),
    employee("3", Direction::Entry, "E7", 9),
  ])
  .await
  .unwrap();

  let snapshot = s.occupancy(window(at(10))).await.unwrap();
  assert_eq!(snapshot.inside_count, 1);
  assert_eq!(snapshot.entries_today, 2);
  assert_eq!(snapshot.exits_today, 1);
}

#[tokio::test]
async fn arrival_order_does_not_matter() {
  let s = store().await;
  s.upsert_batch(vec![vehicle("late-exit", Direction::Exit, "ABC", 30)])
    .await
    .unwrap();
  s.upsert_batch(vec![vehicle("early-entry", Direction::Entry, "ABC", 0)])
    .await
    .unwrap();

  assert_eq!(s.occupancy(window(at(31))).await.unwrap().inside_count, 0);
}

#[tokio::test]
async fn plate_outranks_employee_number_when_grouping() {
  let s = store().await;
  // An employee drives in; the car is the identity, not the person.
  let mut drive_in = employee("1", Direction::Entry, "E7", 0);
  drive_in.entity_kind = EntityKind::Vehicle;
  drive_in.subject.plate = Some("ABC123".into());
  // The same employee walks out; this is a different identity.
  let walk_out = employee("2", Direction::Exit, "E7", 5);
  s.upsert_batch(vec![drive_in, walk_out]).await.unwrap();

  let inside = s.inside(PageRequest::default()).await.unwrap();
  assert_eq!(inside.total, 1);
  assert_eq!(inside.items[0].identity_key, IdentityKey::Plate("ABC123".into()));
}

#[tokio::test]
async fn keyless_events_count_today_but_never_inside() {
  let s = store().await;
  s.upsert_batch(vec![pedestrian("a", Direction::Entry, 0)])
    .await
    .unwrap();

  let snapshot = s.occupancy(window(at(1))).await.unwrap();
  assert_eq!(snapshot.inside_count, 0);
  assert_eq!(snapshot.entries_today, 1);
}

#[tokio::test]
async fn inside_list_is_most_recent_first() {
  let s = store().await;
  s.upsert_batch(vec![
    vehicle("1", Direction::Entry, "AAA", 0),
    vehicle("2", Direction::Entry, "BBB", 8),
    employee("3", Direction::Entry, "E1", 4),
    employee("4", Direction::Exit, "E1", 6),
    vehicle("5", Direction::Entry, "CCC", 2),
  ])
  .await
  .unwrap();

  let page = s.inside(PageRequest::new(Some(2), None)).await.unwrap();
  assert_eq!(page.total, 3);
  let keys: Vec<String> = page
    .items
    .iter()
    .map(|entry| entry.identity_key.to_string())
    .collect();
  assert_eq!(keys, ["P:BBB", "P:CCC"]);
  assert_eq!(page.items[0].event.event.id, id("2"));
}

#[tokio::test]
async fn sql_grouping_agrees_with_in_memory_reconstruction() {
  let s = store().await;
  let mut events = Vec::new();
  for i in 0..60_i64 {
    let direction = if i % 3 == 0 { Direction::Exit } else { Direction::Entry };
    let e = match i % 4 {
      0 => vehicle(&format!("v{i}"), direction, &format!("p{}", i % 5), i),
      1 => employee(&format!("e{i}"), direction, &format!("N{}", i % 3), i),
      2 => {
        let mut e = pedestrian(&format!("q{i}"), direction, i % 7);
        e.subject.scanned_code = Some(format!("QR-{}", i % 2));
        e
      }
      _ => pedestrian(&format!("k{i}"), direction, i),
    };
    events.push(e);
  }
  s.upsert_batch(events.clone()).await.unwrap();

  let presence = Presence::reconstruct(&events);
  let snapshot = s.occupancy(window(at(90))).await.unwrap();
  assert_eq!(snapshot.inside_count, presence.inside_count() as u64);

  let page = s.inside(PageRequest::new(Some(200), None)).await.unwrap();
  let sql: Vec<(String, String)> = page
    .items
    .iter()
    .map(|e| (e.identity_key.to_string(), e.event.event.id.to_string()))
    .collect();
  let memory: Vec<(String, String)> = presence
    .inside()
    .into_iter()
    .map(|(k, e)| (k.to_string(), e.id.to_string()))
    .collect();
  assert_eq!(sql, memory);
}

#[tokio::test]
async fn sub_microsecond_order_decides_the_latest_event() {
  let s = store().await;
  let base = at(0);
  // The greater id comes first in time, so a truncated tie would flip it.
  let mut entry = vehicle("z", Direction::Entry, "ABC", 0);
  entry.occurred_at = base + TimeDelta::nanoseconds(100);
  let mut exit = vehicle("a", Direction::Exit, "ABC", 0);
  exit.occurred_at = base + TimeDelta::nanoseconds(900);
  let events = vec![entry.clone(), exit];
  s.upsert_batch(events.clone()).await.unwrap();

  let stored = s.get_event(&id("z")).await.unwrap().expect("stored");
  assert_eq!(stored.event, entry);

  let presence = Presence::reconstruct(&events);
  assert_eq!(presence.inside_count(), 0);
  let snapshot = s.occupancy(window(at(10))).await.unwrap();
  assert_eq!(snapshot.inside_count, 0);
}

#[tokio::test]
async fn today_window_respects_reference_zone_boundaries() {
  let s = store().await;
  let zone = ReferenceZone::default();
  // 2025-01-15 local runs 07:00Z on the 15th to 06:59:59.999999999Z on the 16th.
  let mut last_second = pedestrian("last", Direction::Entry, 0);
  last_second.occurred_at = utc("2025-01-16T06:59:59Z");
  let mut next_midnight = pedestrian("next", Direction::Entry, 0);
  next_midnight.occurred_at = utc("2025-01-16T07:00:00Z");
  let mut first_second = pedestrian("first", Direction::Entry, 0);
  first_second.occurred_at = utc("2025-01-15T07:00:00Z");
  s.upsert_batch(vec![last_second, next_midnight, first_second])
    .await
    .unwrap();

  let now = utc("2025-01-15T20:00:00Z");
  let snapshot = s
    .occupancy(OccupancyWindow::at(now, &zone).unwrap())
    .await
    .unwrap();
  assert_eq!(snapshot.entries_today, 2);

  let filter = EventFilter { today: true, ..EventFilter::default() }
    .resolve(&zone, now)
    .unwrap();
  let page = s.query(&filter, PageRequest::default()).await.unwrap();
  let ids: Vec<&str> = page.items.iter().map(|e| e.event.id.as_str()).collect();
  assert_eq!(ids, ["last", "first"]);
}

#[tokio::test]
async fn exits_without_entry_counts_only_flagged_exits() {
  let s = store().await;
  let mut flagged = vehicle("a", Direction::Exit, "AAA", 0);
  flagged.exit_without_entry = true;
  let plain = vehicle("b", Direction::Exit, "BBB", 1);
  // An entry carrying the flag is not an exit and never counts.
  let mut odd = vehicle("c", Direction::Entry, "CCC", 2);
  odd.exit_without_entry = true;
  s.upsert_batch(vec![flagged, plain, odd]).await.unwrap();

  let snapshot = s.occupancy(window(at(3))).await.unwrap();
  assert_eq!(snapshot.exits_today, 2);
  assert_eq!(snapshot.exits_without_entry_today, 1);

  let anomalies = EventFilter::exits_without_entry()
    .resolve(&ReferenceZone::default(), at(3))
    .unwrap();
  let page = s.query(&anomalies, PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].event.id, id("a"));
}

#[tokio::test]
async fn active_devices_look_back_fifteen_minutes() {
  let s = store().await;
  let mut old = pedestrian("a", Direction::Entry, 0);
  old.device_id = "TABLET-OLD".into();
  let mut recent = pedestrian("b", Direction::Entry, 50);
  recent.device_id = "TABLET-NEW".into();
  let mut recent_again = pedestrian("c", Direction::Exit, 55);
  recent_again.device_id = "TABLET-NEW".into();
  let mut edge = pedestrian("d", Direction::Entry, 45);
  edge.device_id = "TABLET-EDGE".into();
  s.upsert_batch(vec![old, recent, recent_again, edge]).await.unwrap();

  let snapshot = s.occupancy(window(at(60))).await.unwrap();
  assert_eq!(snapshot.active_devices, 2);
  assert_eq!(snapshot.as_of, at(60));
}

// ─── Sync attempts ───────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_attempts_are_listed_newest_first() {
  let s = store().await;
  s.record_sync_attempt(NewSyncAttempt {
    device_id: Some("TABLET-01".into()),
    received_count: 3,
    confirmed_count: 3,
    ..NewSyncAttempt::default()
  })
  .await
  .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(2)).await;
  let rejected = s
    .record_sync_attempt(NewSyncAttempt {
      device_id: Some("TABLET-02".into()),
      received_count: 2,
      error: Some("vehicles require a plate".into()),
      user_agent: Some("gatelog-capture/0.1".into()),
      ..NewSyncAttempt::default()
    })
    .await
    .unwrap();

  let all = s
    .list_sync_attempts(&SyncAttemptFilter::default(), PageRequest::default())
    .await
    .unwrap();
  assert_eq!(all.total, 2);
  assert_eq!(all.items[0], rejected);

  let errors = s
    .list_sync_attempts(
      &SyncAttemptFilter { errors_only: true, ..SyncAttemptFilter::default() },
      PageRequest::default(),
    )
    .await
    .unwrap();
  assert_eq!(errors.total, 1);
  assert_eq!(errors.items[0].received_count, 2);
  assert_eq!(errors.items[0].confirmed_count, 0);

  let by_device = s
    .list_sync_attempts(
      &SyncAttemptFilter {
        device_id: Some("TABLET-01".into()),
        ..SyncAttemptFilter::default()
      },
      PageRequest::default(),
    )
    .await
    .unwrap();
  assert_eq!(by_device.total, 1);
  assert_eq!(by_device.items[0].confirmed_count, 3);
}

// ─── Devices ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn device_lifecycle() {
  let s = store().await;
  let device = s
    .register_device("TABLET-01".into(), "hash-1".into())
    .await
    .unwrap();
  assert!(device.active);
  assert!(device.last_seen_at.is_none());

  let found = s.find_device_by_key_hash("hash-1".into()).await.unwrap().unwrap();
  assert_eq!(found.device_id, "TABLET-01");

  s.touch_device("TABLET-01".into(), at(5)).await.unwrap();
  let found = s.find_device_by_key_hash("hash-1".into()).await.unwrap().unwrap();
  assert_eq!(found.last_seen_at, Some(at(5)));

  assert!(s.deactivate_device("TABLET-01".into()).await.unwrap());
  assert!(!s.deactivate_device("TABLET-99".into()).await.unwrap());
  let found = s.find_device_by_key_hash("hash-1".into()).await.unwrap().unwrap();
  assert!(!found.active);

  // Re-registering rotates the key and reactivates.
  let device = s
    .register_device("TABLET-01".into(), "hash-2".into())
    .await
    .unwrap();
  assert!(device.active);
  assert!(s.find_device_by_key_hash("hash-1".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn ping_succeeds() {
  store().await.ping().await.unwrap();
}
