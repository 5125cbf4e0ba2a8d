//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC strings so they sort
//! lexicographically. Calendar dates and times of day are ISO 8601.
//! Enumerations are stored as their snake_case labels.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use sica_core::{
  access::AccessEvent,
  discipline::DisciplinaryRecord,
  key::StudentKey,
  notice::Notice,
  role::Role,
  session::User,
  student::Student,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| Error::DateParse(e.to_string()))
}

/// Stored keys were normalised on the way in; anything that does not
/// survive normalisation unchanged is corrupt.
pub fn decode_key(s: &str) -> Result<StudentKey> {
  match StudentKey::parse(s) {
    Ok(key) if key.as_str() == s => Ok(key),
    _ => Err(Error::InvalidColumn { column: "student_key", value: s.to_owned() }),
  }
}

/// Parse a snake_case enumeration label.
pub fn decode_label<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::InvalidColumn { column, value: s.to_owned() })
}

pub fn label<T: Into<&'static str>>(value: T) -> String { value.into().to_owned() }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_key:   String,
  pub name:          String,
  pub group_label:   String,
  pub access_status: String,
}

impl RawStudent {
  pub const COLUMNS: &'static str = "student_key, name, group_label, access_status";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_key:   row.get(0)?,
      name:          row.get(1)?,
      group_label:   row.get(2)?,
      access_status: row.get(3)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      key:    decode_key(&self.student_key)?,
      name:   self.name,
      group:  self.group_label,
      status: decode_label("access_status", &self.access_status)?,
    })
  }
}

/// Raw strings read directly from an `access_events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub student_key: Option<String>,
  pub credential:  String,
  pub event_date:  String,
  pub event_time:  String,
  pub outcome:     String,
  pub recorded_by: String,
}

impl RawEvent {
  pub const COLUMNS: &'static str =
    "event_id, student_key, credential, event_date, event_time, outcome, recorded_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      student_key: row.get(1)?,
      credential:  row.get(2)?,
      event_date:  row.get(3)?,
      event_time:  row.get(4)?,
      outcome:     row.get(5)?,
      recorded_by: row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<AccessEvent> {
    Ok(AccessEvent {
      event_id:    decode_uuid(&self.event_id)?,
      student_key: self.student_key.as_deref().map(decode_key).transpose()?,
      credential:  decode_key(&self.credential)?,
      date:        decode_date(&self.event_date)?,
      time:        decode_time(&self.event_time)?,
      outcome:     decode_label("outcome", &self.outcome)?,
      recorded_by: self.recorded_by,
    })
  }
}

/// Raw strings read directly from a `notices` row.
pub struct RawNotice {
  pub notice_id:   String,
  pub student_key: String,
  pub message:     String,
  pub priority:    String,
  pub active:      bool,
  pub created_at:  String,
  pub created_by:  String,
}

impl RawNotice {
  pub const COLUMNS: &'static str =
    "notice_id, student_key, message, priority, active, created_at, created_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notice_id:   row.get(0)?,
      student_key: row.get(1)?,
      message:     row.get(2)?,
      priority:    row.get(3)?,
      active:      row.get(4)?,
      created_at:  row.get(5)?,
      created_by:  row.get(6)?,
    })
  }

  pub fn into_notice(self) -> Result<Notice> {
    Ok(Notice {
      notice_id:   decode_uuid(&self.notice_id)?,
      student_key: decode_key(&self.student_key)?,
      message:     self.message,
      priority:    decode_label("priority", &self.priority)?,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      created_by:  self.created_by,
    })
  }
}

/// Raw strings read directly from a `disciplinary_records` row.
pub struct RawRecord {
  pub record_id:   String,
  pub student_key: String,
  pub category:    String,
  pub description: String,
  pub tier:        String,
  pub recorded_at: String,
  pub recorded_by: String,
}

impl RawRecord {
  pub const COLUMNS: &'static str =
    "record_id, student_key, category, description, tier, recorded_at, recorded_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      student_key: row.get(1)?,
      category:    row.get(2)?,
      description: row.get(3)?,
      tier:        row.get(4)?,
      recorded_at: row.get(5)?,
      recorded_by: row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<DisciplinaryRecord> {
    Ok(DisciplinaryRecord {
      record_id:   decode_uuid(&self.record_id)?,
      student_key: decode_key(&self.student_key)?,
      category:    decode_label("category", &self.category)?,
      description: self.description,
      tier:        decode_label("tier", &self.tier)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      recorded_by: self.recorded_by,
    })
  }
}

/// A `users` row, including the stored PIN hash.
pub struct RawUser {
  pub username:     String,
  pub display_name: String,
  pub role:         String,
  pub pin_hash:     String,
}

impl RawUser {
  /// Role labels never fail to decode: unknown labels fail safe to
  /// [`Role::Unrecognized`].
  pub fn into_user(self) -> User {
    User {
      username:     self.username,
      display_name: self.display_name,
      role:         Role::parse(&self.role),
    }
  }
}
