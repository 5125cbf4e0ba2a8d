//! In-memory collaborator double for unit tests, with switchable faults.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering::SeqCst},
  },
};

use chrono::{NaiveDate, Utc};
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
  access::{AccessEvent, AccessOutcome},
  dashboard::DailyCount,
  discipline::DisciplinaryRecord,
  key::StudentKey,
  notice::{Notice, NoticePriority},
  pin::verify_pin,
  role::Role,
  session::User,
  store::{
    AccessLogStore, AppendOutcome, DisciplinaryStore, NoticeStore, NoticeTarget, Store,
    StudentDirectory, UserDirectory,
  },
  student::{AccessStatus, Student},
};

pub fn student(key: &str, name: &str, status: AccessStatus) -> Student {
  Student {
    key: StudentKey::parse(key).unwrap(),
    name: name.into(),
    group: "4AMEC".into(),
    status,
  }
}

pub fn user(username: &str, role: Role) -> User {
  User {
    username: username.into(),
    display_name: username.to_uppercase(),
    role,
  }
}

pub fn notice_for(key: &str, message: &str, priority: NoticePriority) -> Notice {
  Notice {
    notice_id: Uuid::new_v4(),
    student_key: StudentKey::parse(key).unwrap(),
    message: message.into(),
    priority,
    active: true,
    created_at: Utc::now(),
    created_by: "staff".into(),
  }
}

#[derive(Debug, thiserror::Error)]
#[error("memory store: {0}")]
pub struct MemoryError(&'static str);

#[derive(Default)]
pub struct MemoryStore {
  students: Mutex<HashMap<StudentKey, Student>>,
  events:   Mutex<Vec<AccessEvent>>,
  notices:  Mutex<Vec<Notice>>,
  records:  Mutex<Vec<DisciplinaryRecord>>,
  users:    Mutex<HashMap<String, (User, String)>>,

  fail_reads:        AtomicBool,
  fail_log_reads:    AtomicBool,
  fail_notice_reads: AtomicBool,
  fail_writes:       AtomicBool,
  stale_dedup:       AtomicBool,
  dropped_acks:      AtomicU32,
  append_calls:      AtomicU32,
  read_delay:        Mutex<Option<Duration>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  pub fn enroll(&self, s: Student) { self.students.lock().unwrap().insert(s.key.clone(), s); }

  pub fn add_account(&self, u: User, pin_hash: &str) {
    self
      .users
      .lock()
      .unwrap()
      .insert(u.username.clone(), (u, pin_hash.to_owned()));
  }

  /// Store a notice as-is, bypassing the one-active rule.
  pub fn put_notice(&self, n: Notice) { self.notices.lock().unwrap().push(n); }

  pub fn events(&self) -> Vec<AccessEvent> { self.events.lock().unwrap().clone() }
  pub fn notices(&self) -> Vec<Notice> { self.notices.lock().unwrap().clone() }
  pub fn records(&self) -> Vec<DisciplinaryRecord> { self.records.lock().unwrap().clone() }
  pub fn append_calls(&self) -> u32 { self.append_calls.load(SeqCst) }

  pub fn fail_reads(&self, on: bool) { self.fail_reads.store(on, SeqCst) }
  pub fn fail_log_reads(&self, on: bool) { self.fail_log_reads.store(on, SeqCst) }
  pub fn fail_notice_reads(&self, on: bool) { self.fail_notice_reads.store(on, SeqCst) }
  pub fn fail_writes(&self, on: bool) { self.fail_writes.store(on, SeqCst) }
  /// Make the same-day check miss existing grants, as a concurrent
  /// terminal's uncommitted write would.
  pub fn stale_dedup(&self, on: bool) { self.stale_dedup.store(on, SeqCst) }
  /// The next `n` event appends reach the log, but each is reported to
  /// the caller as a failure.
  pub fn drop_acks(&self, n: u32) { self.dropped_acks.store(n, SeqCst) }
  pub fn delay_reads(&self, d: Duration) { *self.read_delay.lock().unwrap() = Some(d); }

  async fn read_gate(&self) -> Result<(), MemoryError> {
    let delay = *self.read_delay.lock().unwrap();
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }
    if self.fail_reads.load(SeqCst) {
      return Err(MemoryError("directory offline"));
    }
    Ok(())
  }

  fn write_gate(&self) -> Result<(), MemoryError> {
    if self.fail_writes.load(SeqCst) {
      return Err(MemoryError("write rejected"));
    }
    Ok(())
  }
}

impl Store for MemoryStore {
  type Error = MemoryError;
}

impl StudentDirectory for MemoryStore {
  async fn find_by_key(&self, key: StudentKey) -> Result<Option<Student>, MemoryError> {
    self.read_gate().await?;
    Ok(self.students.lock().unwrap().get(&key).cloned())
  }

  async fn set_access_status(
    &self,
    key: StudentKey,
    status: AccessStatus,
  ) -> Result<bool, MemoryError> {
    self.write_gate()?;
    Ok(match self.students.lock().unwrap().get_mut(&key) {
      Some(s) => {
        s.status = status;
        true
      }
      None => false,
    })
  }

  async fn upsert_student(&self, student: Student) -> Result<(), MemoryError> {
    self.write_gate()?;
    self.enroll(student);
    Ok(())
  }

  async fn list_students(&self) -> Result<Vec<Student>, MemoryError> {
    self.read_gate().await?;
    Ok(self.students.lock().unwrap().values().cloned().collect())
  }
}

impl AccessLogStore for MemoryStore {
  async fn has_granted_event(&self, key: StudentKey, date: NaiveDate) -> Result<bool, MemoryError> {
    if self.fail_log_reads.load(SeqCst) {
      return Err(MemoryError("log offline"));
    }
    if self.stale_dedup.load(SeqCst) {
      return Ok(false);
    }
    Ok(self.events.lock().unwrap().iter().any(|e| {
      e.outcome == AccessOutcome::Granted && e.date == date && e.student_key.as_ref() == Some(&key)
    }))
  }

  async fn append_event(&self, event: AccessEvent) -> Result<AppendOutcome, MemoryError> {
    self.append_calls.fetch_add(1, SeqCst);
    self.write_gate()?;

    let outcome = {
      let mut events = self.events.lock().unwrap();
      if events.iter().any(|e| e.event_id == event.event_id) {
        AppendOutcome::ReplayedId
      } else if event.outcome == AccessOutcome::Granted
        && events.iter().any(|e| {
          e.outcome == AccessOutcome::Granted
            && e.date == event.date
            && e.student_key == event.student_key
        })
      {
        AppendOutcome::DuplicateDay
      } else {
        events.push(event);
        AppendOutcome::Appended
      }
    };

    if self
      .dropped_acks
      .fetch_update(SeqCst, SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Err(MemoryError("ack lost"));
    }
    Ok(outcome)
  }

  async fn events_by_key(&self, key: StudentKey) -> Result<Vec<AccessEvent>, MemoryError> {
    if self.fail_log_reads.load(SeqCst) {
      return Err(MemoryError("log offline"));
    }
    let mut out: Vec<_> = self
      .events
      .lock()
      .unwrap()
      .iter()
      .filter(|e| e.student_key.as_ref() == Some(&key))
      .cloned()
      .collect();
    out.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
    Ok(out)
  }

  async fn daily_granted_counts(&self) -> Result<Vec<DailyCount>, MemoryError> {
    if self.fail_log_reads.load(SeqCst) {
      return Err(MemoryError("log offline"));
    }
    let mut by_day = BTreeMap::new();
    for e in self.events.lock().unwrap().iter() {
      if e.outcome == AccessOutcome::Granted {
        *by_day.entry(e.date).or_insert(0) += 1;
      }
    }
    Ok(by_day.into_iter().map(|(date, count)| DailyCount { date, count }).collect())
  }
}

impl NoticeStore for MemoryStore {
  async fn find_active(&self, key: StudentKey) -> Result<Vec<Notice>, MemoryError> {
    if self.fail_notice_reads.load(SeqCst) {
      return Err(MemoryError("notices offline"));
    }
    Ok(self
      .notices
      .lock()
      .unwrap()
      .iter()
      .filter(|n| n.active && n.student_key == key)
      .cloned()
      .collect())
  }

  async fn insert_notice(&self, notice: Notice) -> Result<(), MemoryError> {
    self.write_gate()?;
    let mut notices = self.notices.lock().unwrap();
    for n in notices.iter_mut().filter(|n| n.student_key == notice.student_key) {
      n.active = false;
    }
    notices.push(notice);
    Ok(())
  }

  async fn deactivate(&self, target: NoticeTarget) -> Result<u64, MemoryError> {
    self.write_gate()?;
    let mut changed = 0;
    for n in self.notices.lock().unwrap().iter_mut().filter(|n| n.active) {
      let hit = match &target {
        NoticeTarget::Id(id) => n.notice_id == *id,
        NoticeTarget::Student(key) => n.student_key == *key,
      };
      if hit {
        n.active = false;
        changed += 1;
      }
    }
    Ok(changed)
  }
}

impl DisciplinaryStore for MemoryStore {
  async fn count_by_key(&self, key: StudentKey) -> Result<u64, MemoryError> {
    self.read_gate().await?;
    Ok(self.records.lock().unwrap().iter().filter(|r| r.student_key == key).count() as u64)
  }

  async fn append_record(&self, record: DisciplinaryRecord) -> Result<(), MemoryError> {
    self.write_gate()?;
    let mut records = self.records.lock().unwrap();
    if !records.iter().any(|r| r.record_id == record.record_id) {
      records.push(record);
    }
    Ok(())
  }

  async fn records_by_key(&self, key: StudentKey) -> Result<Vec<DisciplinaryRecord>, MemoryError> {
    self.read_gate().await?;
    let records = self.records.lock().unwrap();
    Ok(records.iter().rev().filter(|r| r.student_key == key).cloned().collect())
  }

  async fn list_records(&self) -> Result<Vec<DisciplinaryRecord>, MemoryError> {
    self.read_gate().await?;
    Ok(self.records.lock().unwrap().iter().rev().cloned().collect())
  }
}

impl UserDirectory for MemoryStore {
  async fn authenticate(&self, username: String, pin: String) -> Result<Option<User>, MemoryError> {
    self.read_gate().await?;
    let users = self.users.lock().unwrap();
    Ok(
      users
        .get(&username)
        .filter(|(_, hash)| verify_pin(&pin, hash))
        .map(|(u, _)| u.clone()),
    )
  }

  async fn add_user(&self, user: User, pin_hash: String) -> Result<(), MemoryError> {
    self.write_gate()?;
    self.add_account(user, &pin_hash);
    Ok(())
  }
}
