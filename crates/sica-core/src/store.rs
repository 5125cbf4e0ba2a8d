//! Collaborator traits and supporting types.
//!
//! The decision core talks to its backing data only through these traits.
//! They are implemented by storage backends (e.g. `sica-store-sqlite`);
//! higher layers (`sica-server`) depend on the abstraction, not on any
//! concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Arguments are
//! taken by value so the returned futures borrow only `self`.

use std::future::Future;

use chrono::NaiveDate;
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
  access::AccessEvent,
  dashboard::DailyCount,
  discipline::DisciplinaryRecord,
  error::BoxError,
  key::StudentKey,
  notice::Notice,
  session::User,
  student::{AccessStatus, Student},
};

// ─── Base ────────────────────────────────────────────────────────────────────

/// Shared error type for a backend. Every collaborator trait extends this,
/// so a single backend type has exactly one `Error`.
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Student directory ───────────────────────────────────────────────────────

pub trait StudentDirectory: Store {
  /// Exact-match lookup. `Ok(None)` means the key is not enrolled; a backend
  /// that cannot answer must return `Err`, never `Ok(None)`.
  fn find_by_key(
    &self,
    key: StudentKey,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Flip the access-status flag. Returns `false` if the key is not enrolled.
  fn set_access_status(
    &self,
    key: StudentKey,
    status: AccessStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert or replace a directory entry. Used by the enrollment feed.
  fn upsert_student(
    &self,
    student: Student,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_students(
    &self,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;
}

// ─── Access log ──────────────────────────────────────────────────────────────

/// What happened to an append against the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
  Appended,
  /// An event with this `event_id` is already stored. The write was a
  /// no-op, and the stored event is this one.
  ReplayedId,
  /// A different granted event for the same `(student key, date)` already
  /// exists. The write was a no-op.
  DuplicateDay,
}

/// Append-only audit log of scan outcomes.
///
/// Backends must enforce at most one granted event per `(student key, date)`
/// themselves, so that concurrent terminals and retried writes can never
/// record a second grant.
pub trait AccessLogStore: Store {
  fn has_granted_event(
    &self,
    key: StudentKey,
    date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append `event`. Re-appending an already-stored `event_id` returns
  /// [`AppendOutcome::ReplayedId`]; this takes precedence over the day rule.
  /// Appending a granted event whose `(key, date)` already has a different
  /// grant returns [`AppendOutcome::DuplicateDay`].
  fn append_event(
    &self,
    event: AccessEvent,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  /// All events recorded against `key`, newest first.
  fn events_by_key(
    &self,
    key: StudentKey,
  ) -> impl Future<Output = Result<Vec<AccessEvent>, Self::Error>> + Send + '_;

  /// Granted events per calendar date, oldest date first.
  fn daily_granted_counts(
    &self,
  ) -> impl Future<Output = Result<Vec<DailyCount>, Self::Error>> + Send + '_;
}

// ─── Notices ─────────────────────────────────────────────────────────────────

/// Selector for [`NoticeStore::deactivate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeTarget {
  Id(Uuid),
  Student(StudentKey),
}

pub trait NoticeStore: Store {
  /// Every notice currently flagged active for `key`. Well-behaved backends
  /// return at most one; [`crate::notice::active_notice`] copes with more.
  fn find_active(
    &self,
    key: StudentKey,
  ) -> impl Future<Output = Result<Vec<Notice>, Self::Error>> + Send + '_;

  /// Persist an active notice, deactivating any prior active notice for the
  /// same student in the same write.
  fn insert_notice(
    &self,
    notice: Notice,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Deactivate matching notices and return how many changed.
  fn deactivate(
    &self,
    target: NoticeTarget,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Disciplinary records ────────────────────────────────────────────────────

pub trait DisciplinaryStore: Store {
  /// Number of records ever appended for `key`.
  fn count_by_key(
    &self,
    key: StudentKey,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Append a record. Re-appending an existing `record_id` is a no-op.
  fn append_record(
    &self,
    record: DisciplinaryRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Records for `key`, newest first.
  fn records_by_key(
    &self,
    key: StudentKey,
  ) -> impl Future<Output = Result<Vec<DisciplinaryRecord>, Self::Error>> + Send + '_;

  /// Every record, newest first.
  fn list_records(
    &self,
  ) -> impl Future<Output = Result<Vec<DisciplinaryRecord>, Self::Error>> + Send + '_;
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub trait UserDirectory: Store {
  /// Return the user if `username` exists and `pin` matches its stored hash.
  fn authenticate(
    &self,
    username: String,
    pin: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Create or replace a staff account. `pin_hash` is an argon2 PHC string
  /// from [`crate::pin::hash_pin`].
  fn add_user(
    &self,
    user: User,
    pin_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// A backend that provides every collaborator.
pub trait SicaStore:
  StudentDirectory + AccessLogStore + NoticeStore + DisciplinaryStore + UserDirectory
{
}

impl<T> SicaStore for T where
  T: StudentDirectory + AccessLogStore + NoticeStore + DisciplinaryStore + UserDirectory
{
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Await a store call for at most `timeout`, erasing the backend error type.
/// An elapsed timer is reported as an error like any other failure.
pub(crate) async fn bounded<T, E, F>(timeout: Duration, call: F) -> Result<T, BoxError>
where
  F: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(timeout, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Box::new(e)),
    Err(elapsed) => Err(Box::new(elapsed)),
  }
}
