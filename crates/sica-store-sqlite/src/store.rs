//! [`SqliteStore`], the SQLite implementation of the collaborator traits.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;

use sica_core::{
  access::AccessEvent,
  dashboard::DailyCount,
  discipline::DisciplinaryRecord,
  key::StudentKey,
  notice::Notice,
  pin::verify_pin,
  session::User,
  store::{
    AccessLogStore, AppendOutcome, DisciplinaryStore, NoticeStore, NoticeTarget, Store,
    StudentDirectory, UserDirectory,
  },
  student::{AccessStatus, Student},
};

use crate::{
  Result,
  encode::{
    RawEvent, RawNotice, RawRecord, RawStudent, RawUser, decode_date, encode_date, encode_dt,
    encode_time, encode_uuid, label,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A SICA store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// terminal served by one process shares it; SQLite serialises writers, and
/// the uniqueness indexes in [`SCHEMA`] hold across processes too.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_events(&self, sql: String, key: String) -> Result<Vec<AccessEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![key], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn query_records(&self, key: Option<String>) -> Result<Vec<DisciplinaryRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = key {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM disciplinary_records WHERE student_key = ?1
             ORDER BY recorded_at DESC",
            RawRecord::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![k], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM disciplinary_records ORDER BY recorded_at DESC",
            RawRecord::COLUMNS
          ))?;
          stmt
            .query_map([], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

impl Store for SqliteStore {
  type Error = crate::Error;
}

// ─── Student directory ───────────────────────────────────────────────────────

impl StudentDirectory for SqliteStore {
  async fn find_by_key(&self, key: StudentKey) -> Result<Option<Student>> {
    let key_str = key.to_string();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM students WHERE student_key = ?1", RawStudent::COLUMNS),
              rusqlite::params![key_str],
              RawStudent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn set_access_status(&self, key: StudentKey, status: AccessStatus) -> Result<bool> {
    let key_str    = key.to_string();
    let status_str = label(status);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE students SET access_status = ?1 WHERE student_key = ?2",
          rusqlite::params![status_str, key_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn upsert_student(&self, student: Student) -> Result<()> {
    let key_str    = student.key.to_string();
    let status_str = label(student.status);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (student_key, name, group_label, access_status)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(student_key) DO UPDATE SET
             name          = excluded.name,
             group_label   = excluded.group_label,
             access_status = excluded.access_status",
          rusqlite::params![key_str, student.name, student.group, status_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    let raws: Vec<RawStudent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM students ORDER BY student_key",
          RawStudent::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }
}

// ─── Access log ──────────────────────────────────────────────────────────────

impl AccessLogStore for SqliteStore {
  async fn has_granted_event(&self, key: StudentKey, date: NaiveDate) -> Result<bool> {
    let key_str  = key.to_string();
    let date_str = encode_date(date);

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM access_events
               WHERE student_key = ?1 AND event_date = ?2 AND outcome = 'granted'",
              rusqlite::params![key_str, date_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(found)
  }

  async fn append_event(&self, event: AccessEvent) -> Result<AppendOutcome> {
    let id_str      = encode_uuid(event.event_id);
    let key_str     = event.student_key.as_ref().map(StudentKey::to_string);
    let cred_str    = event.credential.to_string();
    let date_str    = encode_date(event.date);
    let time_str    = encode_time(event.time);
    let outcome_str = label(event.outcome);
    let by          = event.recorded_by;

    // OR IGNORE turns a replayed event_id or a second grant for the same
    // (student, date) into a no-op; the follow-up lookup says which.
    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT OR IGNORE INTO access_events (
             event_id, student_key, credential, event_date, event_time, outcome, recorded_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, key_str, cred_str, date_str, time_str, outcome_str, by],
        )?;
        if inserted > 0 {
          return Ok(AppendOutcome::Appended);
        }
        let replayed: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM access_events WHERE event_id = ?1)",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;
        Ok(if replayed { AppendOutcome::ReplayedId } else { AppendOutcome::DuplicateDay })
      })
      .await?;

    Ok(outcome)
  }

  async fn events_by_key(&self, key: StudentKey) -> Result<Vec<AccessEvent>> {
    let sql = format!(
      "SELECT {} FROM access_events WHERE student_key = ?1
       ORDER BY event_date DESC, event_time DESC",
      RawEvent::COLUMNS
    );
    self.query_events(sql, key.to_string()).await
  }

  async fn daily_granted_counts(&self) -> Result<Vec<DailyCount>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT event_date, COUNT(*) FROM access_events
           WHERE outcome = 'granted'
           GROUP BY event_date
           ORDER BY event_date",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(date, count)| {
        Ok(DailyCount { date: decode_date(&date)?, count: count.max(0) as u64 })
      })
      .collect()
  }
}

// ─── Notices ─────────────────────────────────────────────────────────────────

impl NoticeStore for SqliteStore {
  async fn find_active(&self, key: StudentKey) -> Result<Vec<Notice>> {
    let key_str = key.to_string();

    let raws: Vec<RawNotice> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM notices WHERE student_key = ?1 AND active = 1
           ORDER BY created_at DESC",
          RawNotice::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![key_str], RawNotice::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotice::into_notice).collect()
  }

  async fn insert_notice(&self, notice: Notice) -> Result<()> {
    let id_str       = encode_uuid(notice.notice_id);
    let key_str      = notice.student_key.to_string();
    let priority_str = label(notice.priority);
    let at_str       = encode_dt(notice.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE notices SET active = 0 WHERE student_key = ?1 AND active = 1",
          rusqlite::params![key_str],
        )?;
        tx.execute(
          "INSERT INTO notices (
             notice_id, student_key, message, priority, active, created_at, created_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            key_str,
            notice.message,
            priority_str,
            notice.active,
            at_str,
            notice.created_by,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn deactivate(&self, target: NoticeTarget) -> Result<u64> {
    let (sql, arg) = match target {
      NoticeTarget::Id(id) => (
        "UPDATE notices SET active = 0 WHERE notice_id = ?1 AND active = 1",
        encode_uuid(id),
      ),
      NoticeTarget::Student(key) => (
        "UPDATE notices SET active = 0 WHERE student_key = ?1 AND active = 1",
        key.to_string(),
      ),
    };

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params![arg])?))
      .await?;

    Ok(changed as u64)
  }
}

// ─── Disciplinary records ────────────────────────────────────────────────────

impl DisciplinaryStore for SqliteStore {
  async fn count_by_key(&self, key: StudentKey) -> Result<u64> {
    let key_str = key.to_string();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM disciplinary_records WHERE student_key = ?1",
          rusqlite::params![key_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  async fn append_record(&self, record: DisciplinaryRecord) -> Result<()> {
    let id_str       = encode_uuid(record.record_id);
    let key_str      = record.student_key.to_string();
    let category_str = label(record.category);
    let tier_str     = label(record.tier);
    let at_str       = encode_dt(record.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO disciplinary_records (
             record_id, student_key, category, description, tier, recorded_at, recorded_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            key_str,
            category_str,
            record.description,
            tier_str,
            at_str,
            record.recorded_by,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn records_by_key(&self, key: StudentKey) -> Result<Vec<DisciplinaryRecord>> {
    self.query_records(Some(key.to_string())).await
  }

  async fn list_records(&self) -> Result<Vec<DisciplinaryRecord>> {
    self.query_records(None).await
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  async fn authenticate(&self, username: String, pin: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT username, display_name, role, pin_hash FROM users WHERE username = ?1",
              rusqlite::params![username],
              |row| {
                Ok(RawUser {
                  username:     row.get(0)?,
                  display_name: row.get(1)?,
                  role:         row.get(2)?,
                  pin_hash:     row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(
      raw
        .filter(|r| verify_pin(&pin, &r.pin_hash))
        .map(RawUser::into_user),
    )
  }

  async fn add_user(&self, user: User, pin_hash: String) -> Result<()> {
    let role_str = user.role.label().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, display_name, role, pin_hash)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(username) DO UPDATE SET
             display_name = excluded.display_name,
             role         = excluded.role,
             pin_hash     = excluded.pin_hash",
          rusqlite::params![user.username, user.display_name, role_str, pin_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
