//! The local capture queue: every record the guard saves, synced or not.
//!
//! Records are stored as JSON payloads next to the few columns the queue
//! searches on. Nothing is ever deleted; syncing only flips `synced`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use gatelog_core::{
  event::{Event, EventId},
  identity::IdentityKey,
};
use rusqlite::OptionalExtension as _;

const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS captures (
    local_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id        TEXT NOT NULL UNIQUE,
    plate           TEXT,
    employee_number TEXT,
    scanned_code    TEXT,
    occurred_at     TEXT NOT NULL,
    payload         TEXT NOT NULL,    -- JSON-encoded Event
    synced          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS captures_plate_idx    ON captures(plate);
CREATE INDEX IF NOT EXISTS captures_employee_idx ON captures(employee_number);
CREATE INDEX IF NOT EXISTS captures_code_idx     ON captures(scanned_code);
CREATE INDEX IF NOT EXISTS captures_synced_idx   ON captures(synced, occurred_at);
";

/// One queued record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
  pub event:  Event,
  pub synced: bool,
}

/// Embedded SQLite queue. Cloning is cheap.
#[derive(Clone)]
pub struct Queue {
  conn: tokio_rusqlite::Connection,
}

impl Queue {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .with_context(|| format!("opening capture queue {}", path.display()))?;
    Self::init(conn).await
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .context("initialising capture queue")?;
    Ok(Self { conn })
  }

  /// Queue a new, unsynced record.
  pub async fn push(&self, event: &Event) -> Result<()> {
    let payload = serde_json::to_string(event).context("encoding capture")?;
    let event_id = event.id.to_string();
    let plate = event.subject.plate.clone();
    let employee_number = event.subject.employee_number.clone();
    let scanned_code = event.subject.scanned_code.clone();
    let occurred_at = event.occurred_at.to_rfc3339_opts(SecondsFormat::Nanos, true);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO captures (
             event_id, plate, employee_number, scanned_code, occurred_at, payload
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            event_id,
            plate,
            employee_number,
            scanned_code,
            occurred_at,
            payload,
          ],
        )?;
        Ok(())
      })
      .await
      .context("saving capture")?;
    Ok(())
  }

  /// Unsynced records, oldest first, at most `limit`.
  pub async fn pending(&self, limit: usize) -> Result<Vec<Event>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = self
      .select(
        "WHERE synced = 0 ORDER BY occurred_at ASC, local_id ASC LIMIT ?1",
        vec![limit.into()],
      )
      .await?;
    Ok(rows.into_iter().map(|c| c.event).collect())
  }

  pub async fn pending_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM captures WHERE synced = 0",
          [],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(n.unsigned_abs())
  }

  /// Most recent records first.
  pub async fn history(&self, limit: usize) -> Result<Vec<Capture>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self
      .select(
        "ORDER BY occurred_at DESC, event_id DESC LIMIT ?1",
        vec![limit.into()],
      )
      .await
  }

  /// Every record that could share `key`. Callers still group them by key,
  /// since the raw columns match more loosely than the key does.
  pub async fn related(&self, key: &IdentityKey) -> Result<Vec<Event>> {
    let (column, value) = match key {
      IdentityKey::Plate(v) => ("plate", v),
      IdentityKey::Employee(v) => ("employee_number", v),
      IdentityKey::Code(v) => ("scanned_code", v),
    };
    let rows = self
      .select(&format!("WHERE {column} = ?1"), vec![value.clone().into()])
      .await?;
    Ok(rows.into_iter().map(|c| c.event).collect())
  }

  pub async fn get(&self, id: &EventId) -> Result<Option<Capture>> {
    let id = id.to_string();
    let row: Option<(String, bool)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT payload, synced FROM captures WHERE event_id = ?1",
              rusqlite::params![id],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;
    row.map(decode).transpose()
  }

  /// Flag `ids` as synced. Unknown ids are ignored. Returns the number of
  /// records that changed state.
  pub async fn mark_synced(&self, ids: &[EventId]) -> Result<usize> {
    let ids: Vec<String> = ids.iter().map(EventId::to_string).collect();
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE captures SET synced = 1 WHERE event_id = ?1 AND synced = 0",
          )?;
          for id in &ids {
            changed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await
      .context("marking captures as synced")?;
    Ok(changed)
  }

  async fn select(
    &self,
    tail: &str,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Capture>> {
    let sql = format!("SELECT payload, synced FROM captures {tail}");
    let rows: Vec<(String, bool)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    rows.into_iter().map(decode).collect()
  }
}

fn decode((payload, synced): (String, bool)) -> Result<Capture> {
  let event = serde_json::from_str(&payload).context("decoding queued capture")?;
  Ok(Capture { event, synced })
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone, Utc};
  use gatelog_core::event::{Direction, EntityKind, PersonCategory};

  use super::*;

  fn event(id: &str, plate: &str, minutes: i64) -> Event {
    let mut e = Event::new(
      EventId::new(id).unwrap(),
      Direction::Entry,
      EntityKind::Vehicle,
      PersonCategory::Visitor,
      Utc.with_ymd_and_hms(2025, 1, 15, 16, 0, 0).unwrap() + TimeDelta::minutes(minutes),
      "TABLET-01",
    );
    e.subject.plate = Some(plate.into());
    e
  }

  #[tokio::test]
  async fn push_pending_and_mark() {
    let q = Queue::open_in_memory().await.unwrap();
    q.push(&event("b", "AAA", 5)).await.unwrap();
    q.push(&event("a", "BBB", 1)).await.unwrap();

    let pending = q.pending(10).await.unwrap();
    let ids: Vec<&str> = pending.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(q.pending_count().await.unwrap(), 2);

    let changed = q
      .mark_synced(&[EventId::new("a").unwrap(), EventId::new("zzz").unwrap()])
      .await
      .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(q.pending_count().await.unwrap(), 1);
    assert!(q.get(&EventId::new("a").unwrap()).await.unwrap().unwrap().synced);
  }

  #[tokio::test]
  async fn duplicate_ids_are_refused() {
    let q = Queue::open_in_memory().await.unwrap();
    q.push(&event("a", "AAA", 0)).await.unwrap();
    assert!(q.push(&event("a", "AAA", 1)).await.is_err());
  }

  #[tokio::test]
  async fn history_is_newest_first_and_related_matches_key_column() {
    let q = Queue::open_in_memory().await.unwrap();
    q.push(&event("1", "AAA", 0)).await.unwrap();
    q.push(&event("2", "BBB", 3)).await.unwrap();
    q.push(&event("3", "AAA", 6)).await.unwrap();

    let history = q.history(2).await.unwrap();
    let ids: Vec<&str> = history.iter().map(|c| c.event.id.as_str()).collect();
    assert_eq!(ids, ["3", "2"]);

    let related = q.related(&IdentityKey::Plate("AAA".into())).await.unwrap();
    assert_eq!(related.len(), 2);
  }
}
