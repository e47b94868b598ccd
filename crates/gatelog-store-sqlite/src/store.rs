//! [`SqliteStore`], the SQLite implementation of [`EventStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use uuid::Uuid;

use gatelog_core::{
  audit::{NewSyncAttempt, SyncAttempt, SyncAttemptFilter},
  device::Device,
  event::{Direction, Event, EventId, StoredEvent},
  occupancy::{InsideEntry, OccupancySnapshot, OccupancyWindow},
  query::{EXPORT_ROW_CAP, Page, PageRequest, ResolvedFilter},
  store::EventStore,
};

use crate::{
  Result,
  encode::{
    EVENT_COLUMN_COUNT, EVENT_COLUMNS, RawDevice, RawEvent, RawInsideEntry,
    RawSyncAttempt, encode_dt,
  },
  schema::SCHEMA,
  sql::{IDENTITY_KEY_EXPR, WhereClause, event_filter, register_functions},
};

const UPSERT_EVENT: &str = "
  INSERT INTO events (
    event_id, direction, entity_kind, category,
    name, employee_number, company, area, purpose,
    plate, vehicle_model, vehicle_color, scanned_code,
    occurred_at, device_id, exit_without_entry, received_at, updated_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
  ON CONFLICT(event_id) DO UPDATE SET
    direction          = excluded.direction,
    entity_kind        = excluded.entity_kind,
    category           = excluded.category,
    name               = excluded.name,
    employee_number    = excluded.employee_number,
    company            = excluded.company,
    area               = excluded.area,
    purpose            = excluded.purpose,
    plate              = excluded.plate,
    vehicle_model      = excluded.vehicle_model,
    vehicle_color      = excluded.vehicle_color,
    scanned_code       = excluded.scanned_code,
    occurred_at        = excluded.occurred_at,
    device_id          = excluded.device_id,
    exit_without_entry = excluded.exit_without_entry,
    updated_at         = excluded.updated_at";

const EVENT_ORDER: &str = "ORDER BY occurred_at DESC, event_id DESC";

const DEVICE_COLUMNS: &str = "device_id, active, created_at, last_seen_at";

/// The latest event per identity key (`rn = 1`), keyless events dropped.
fn latest_per_identity() -> String {
  format!(
    "WITH keyed AS (
       SELECT *, {IDENTITY_KEY_EXPR} AS ident FROM events
     ),
     latest AS (
       SELECT *, ROW_NUMBER() OVER (
         PARTITION BY ident {EVENT_ORDER}
       ) AS rn
       FROM keyed
       WHERE ident IS NOT NULL
     )"
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gate logbook backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init().await?;
    Ok(store)
  }

  async fn init(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select_events(
    &self,
    clause: WhereClause,
    limit: u32,
    offset: u32,
  ) -> Result<Vec<StoredEvent>> {
    let where_sql = clause.sql();
    let mut params = clause.into_params();
    params.push(Value::Integer(i64::from(limit)));
    params.push(Value::Integer(i64::from(offset)));

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events{where_sql} {EVENT_ORDER} LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_stored).collect()
  }

  async fn count_events(&self, clause: &WhereClause) -> Result<u64> {
    let where_sql = clause.sql();
    let params = clause.params().to_vec();

    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM events{where_sql}"),
          params_from_iter(params.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total.unsigned_abs())
  }

  async fn select_device(&self, device_id: String) -> Result<Option<Device>> {
    let raw: Option<RawDevice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE device_id = ?1"),
              rusqlite::params![device_id],
              RawDevice::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDevice::into_device).transpose()
  }
}

/// Bind values for one upsert, in `UPSERT_EVENT` parameter order.
fn upsert_params(event: &Event, now: &str) -> [Value; 17] {
  let text = |v: &Option<String>| match v {
    Some(s) => Value::Text(s.clone()),
    None => Value::Null,
  };
  let subject = &event.subject;
  [
    Value::Text(event.id.as_str().to_owned()),
    Value::Text(event.direction.as_ref().to_owned()),
    Value::Text(event.entity_kind.as_ref().to_owned()),
    Value::Text(event.category.as_ref().to_owned()),
    text(&subject.name),
    text(&subject.employee_number),
    text(&subject.company),
    text(&subject.area),
    text(&subject.purpose),
    text(&subject.plate),
    text(&subject.vehicle_model),
    text(&subject.vehicle_color),
    text(&subject.scanned_code),
    Value::Text(encode_dt(event.occurred_at)),
    Value::Text(event.device_id.clone()),
    Value::Integer(i64::from(event.exit_without_entry)),
    Value::Text(now.to_owned()),
  ]
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = crate::Error;

  // ── Event log: writes ────────────────────────────────────────────────────

  async fn upsert(&self, event: Event) -> Result<EventId> {
    let id = event.id.clone();
    let params = upsert_params(&event, &encode_dt(Utc::now()));

    self
      .conn
      .call(move |conn| {
        conn.execute(UPSERT_EVENT, params_from_iter(params.iter()))?;
        Ok(())
      })
      .await?;

    Ok(id)
  }

  async fn upsert_batch(&self, events: Vec<Event>) -> Result<Vec<EventId>> {
    let now = encode_dt(Utc::now());

    let mut seen = HashSet::new();
    let confirmed: Vec<EventId> = events
      .iter()
      .filter(|e| seen.insert(e.id.clone()))
      .map(|e| e.id.clone())
      .collect();

    let rows: Vec<[Value; 17]> =
      events.iter().map(|e| upsert_params(e, &now)).collect();
    let count = rows.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(UPSERT_EVENT)?;
          for params in &rows {
            stmt.execute(params_from_iter(params.iter()))?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(count, unique = confirmed.len(), "batch upserted");
    Ok(confirmed)
  }

  // ── Event log: reads ─────────────────────────────────────────────────────

  async fn get_event(&self, id: &EventId) -> Result<Option<StoredEvent>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
              rusqlite::params![id_str],
              RawEvent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_stored).transpose()
  }

  async fn query(
    &self,
    filter: &ResolvedFilter,
    page: PageRequest,
  ) -> Result<Page<StoredEvent>> {
    let clause = event_filter(filter);
    let total = self.count_events(&clause).await?;
    let items = self.select_events(clause, page.limit, page.offset).await?;
    Ok(Page::new(page, total, items))
  }

  async fn query_for_export(
    &self,
    filter: &ResolvedFilter,
  ) -> Result<Vec<StoredEvent>> {
    self
      .select_events(event_filter(filter), EXPORT_ROW_CAP, 0)
      .await
  }

  // ── Occupancy ─────────────────────────────────────────────────────────────

  async fn occupancy(&self, window: OccupancyWindow) -> Result<OccupancySnapshot> {
    let from = window.today.from.map(encode_dt);
    let to = window.today.to.map(encode_dt);
    let active_since = encode_dt(window.active_since);
    let entry = Direction::Entry.as_ref();
    let exit = Direction::Exit.as_ref();

    let sql = format!(
      "{latest}
       SELECT
         (SELECT COUNT(*) FROM latest WHERE rn = 1 AND direction = '{entry}'),
         (SELECT COUNT(*) FROM events
            WHERE direction = '{entry}' AND occurred_at BETWEEN ?1 AND ?2),
         (SELECT COUNT(*) FROM events
            WHERE direction = '{exit}' AND occurred_at BETWEEN ?1 AND ?2),
         (SELECT COUNT(*) FROM events
            WHERE direction = '{exit}' AND exit_without_entry = 1
              AND occurred_at BETWEEN ?1 AND ?2),
         (SELECT COUNT(DISTINCT device_id) FROM events WHERE occurred_at >= ?3)",
      latest = latest_per_identity(),
    );

    let counts: [i64; 5] = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params![from, to, active_since],
          |row| {
            Ok([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?])
          },
        )?)
      })
      .await?;

    let [inside, entries, exits, orphan_exits, devices] =
      counts.map(i64::unsigned_abs);

    Ok(OccupancySnapshot {
      inside_count:              inside,
      entries_today:             entries,
      exits_today:               exits,
      exits_without_entry_today: orphan_exits,
      active_devices:            devices,
      as_of:                     window.as_of,
    })
  }

  async fn inside(&self, page: PageRequest) -> Result<Page<InsideEntry>> {
    let entry = Direction::Entry.as_ref();
    let latest = latest_per_identity();
    let count_sql = format!(
      "{latest} SELECT COUNT(*) FROM latest WHERE rn = 1 AND direction = '{entry}'"
    );
    let list_sql = format!(
      "{latest}
       SELECT {EVENT_COLUMNS}, ident FROM latest
       WHERE rn = 1 AND direction = '{entry}'
       {EVENT_ORDER}
       LIMIT ?1 OFFSET ?2"
    );
    let (limit, offset) = (page.limit, page.offset);

    let (total, raws): (i64, Vec<RawInsideEntry>) = self
      .conn
      .call(move |conn| {
        let total = conn.query_row(&count_sql, [], |row| row.get(0))?;
        let mut stmt = conn.prepare(&list_sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], |row| {
            Ok(RawInsideEntry {
              event:        RawEvent::from_row(row)?,
              identity_key: row.get(EVENT_COLUMN_COUNT)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawInsideEntry::into_entry)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, total.unsigned_abs(), items))
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn record_sync_attempt(&self, input: NewSyncAttempt) -> Result<SyncAttempt> {
    let attempt = SyncAttempt {
      attempt_id:      Uuid::new_v4(),
      device_id:       input.device_id,
      received_count:  input.received_count,
      confirmed_count: input.confirmed_count,
      remote_addr:     input.remote_addr,
      user_agent:      input.user_agent,
      error:           input.error,
      created_at:      Utc::now(),
    };

    let id_str      = attempt.attempt_id.to_string();
    let device_id   = attempt.device_id.clone();
    let received    = attempt.received_count;
    let confirmed   = attempt.confirmed_count;
    let remote_addr = attempt.remote_addr.clone();
    let user_agent  = attempt.user_agent.clone();
    let error       = attempt.error.clone();
    let at_str      = encode_dt(attempt.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_attempts (
             attempt_id, device_id, received_count, confirmed_count,
             remote_addr, user_agent, error, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            device_id,
            received,
            confirmed,
            remote_addr,
            user_agent,
            error,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(attempt)
  }

  async fn list_sync_attempts(
    &self,
    filter: &SyncAttemptFilter,
    page: PageRequest,
  ) -> Result<Page<SyncAttempt>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(device_id) = filter.device_id.as_deref().map(str::trim)
      && !device_id.is_empty()
    {
      conditions.push("device_id = ?");
      params.push(Value::Text(device_id.to_owned()));
    }
    if filter.errors_only {
      conditions.push("error IS NOT NULL");
    }
    let where_sql = if conditions.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", conditions.join(" AND "))
    };
    let (limit, offset) = (page.limit, page.offset);

    let (total, raws): (i64, Vec<RawSyncAttempt>) = self
      .conn
      .call(move |conn| {
        let total = conn.query_row(
          &format!("SELECT COUNT(*) FROM sync_attempts{where_sql}"),
          params_from_iter(params.iter()),
          |row| row.get(0),
        )?;

        params.push(Value::Integer(i64::from(limit)));
        params.push(Value::Integer(i64::from(offset)));
        let mut stmt = conn.prepare(&format!(
          "SELECT attempt_id, device_id, received_count, confirmed_count,
                  remote_addr, user_agent, error, created_at
           FROM sync_attempts{where_sql}
           ORDER BY created_at DESC, attempt_id DESC
           LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), |row| {
            Ok(RawSyncAttempt {
              attempt_id:      row.get(0)?,
              device_id:       row.get(1)?,
              received_count:  row.get(2)?,
              confirmed_count: row.get(3)?,
              remote_addr:     row.get(4)?,
              user_agent:      row.get(5)?,
              error:           row.get(6)?,
              created_at:      row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawSyncAttempt::into_attempt)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, total.unsigned_abs(), items))
  }

  // ── Devices ───────────────────────────────────────────────────────────────

  async fn register_device(&self, device_id: String, key_hash: String) -> Result<Device> {
    let id = device_id.clone();
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO devices (device_id, key_hash, active, created_at)
           VALUES (?1, ?2, 1, ?3)
           ON CONFLICT(device_id) DO UPDATE SET
             key_hash = excluded.key_hash,
             active   = 1",
          rusqlite::params![id, key_hash, now],
        )?;
        Ok(())
      })
      .await?;

    self
      .select_device(device_id.clone())
      .await?
      .ok_or_else(|| crate::Error::Corrupt {
        column: "device_id",
        value:  device_id,
      })
  }

  async fn deactivate_device(&self, device_id: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE devices SET active = 0 WHERE device_id = ?1",
          rusqlite::params![device_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn find_device_by_key_hash(&self, key_hash: String) -> Result<Option<Device>> {
    let raw: Option<RawDevice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE key_hash = ?1"),
              rusqlite::params![key_hash],
              RawDevice::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDevice::into_device).transpose()
  }

  async fn touch_device(&self, device_id: String, at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE devices SET last_seen_at = ?2 WHERE device_id = ?1",
          rusqlite::params![device_id, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Health ────────────────────────────────────────────────────────────────

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
