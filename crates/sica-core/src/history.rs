//! Read-side views for staff: a student's access history, their incident
//! record, and the digital file that combines directory data with both.

use serde::Serialize;
use tokio::time::Duration;

use crate::{
  Error, Result,
  access::AccessEvent,
  discipline::{DisciplinaryRecord, Tier, next_tier},
  key::StudentKey,
  notice::{Notice, active_notice},
  store::{AccessLogStore, DisciplinaryStore, NoticeStore, StudentDirectory, bounded},
  student::{Resolution, Student, resolve},
};

/// Every recorded scan of `key`, newest first.
pub async fn access_history<L: AccessLogStore>(
  log: &L,
  key: &StudentKey,
  timeout: Duration,
) -> Result<Vec<AccessEvent>> {
  bounded(timeout, log.events_by_key(key.clone()))
    .await
    .map_err(Error::AccessLogUnavailable)
}

/// Incident records for `key`, newest first.
pub async fn incident_history<D: DisciplinaryStore>(
  store: &D,
  key: &StudentKey,
  timeout: Duration,
) -> Result<Vec<DisciplinaryRecord>> {
  bounded(timeout, store.records_by_key(key.clone()))
    .await
    .map_err(Error::DirectoryUnavailable)
}

/// All incident records across students, newest first.
pub async fn incident_log<D: DisciplinaryStore>(
  store: &D,
  timeout: Duration,
) -> Result<Vec<DisciplinaryRecord>> {
  bounded(timeout, store.list_records())
    .await
    .map_err(Error::DirectoryUnavailable)
}

/// The digital student file.
#[derive(Debug, Clone, Serialize)]
pub struct StudentFile {
  pub student:   Student,
  pub notice:    Option<Notice>,
  pub incidents: Vec<DisciplinaryRecord>,
  /// The tier the next recorded incident would receive.
  pub next_tier: Tier,
}

pub async fn student_file<S>(store: &S, key: &StudentKey, timeout: Duration) -> Result<StudentFile>
where
  S: StudentDirectory + NoticeStore + DisciplinaryStore,
{
  let student = match resolve(store, key, timeout).await? {
    Resolution::NotFound => return Err(Error::StudentNotFound(key.clone())),
    Resolution::FoundActive(s) | Resolution::FoundBlocked(s) => s,
  };

  let notice = match active_notice(store, key, timeout).await {
    Ok(n) => n,
    Err(e) => {
      tracing::warn!(key = %key, error = %e, "notice lookup failed; file shown without notice");
      None
    }
  };

  let incidents = incident_history(store, key, timeout).await?;
  let next_tier = next_tier(incidents.len() as i64);

  Ok(StudentFile { student, notice, incidents, next_tier })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;

  use super::*;
  use crate::{
    access::{AccessProcessor, ScanPolicy},
    discipline::{IncidentCategory, NewIncident, record_incident},
    notice::NoticePriority,
    role::Role,
    student::AccessStatus,
    testing::{MemoryStore, notice_for, student, user},
  };

  const T: Duration = Duration::from_millis(200);

  fn key(s: &str) -> StudentKey { StudentKey::parse(s).unwrap() }

  async fn incident(store: &MemoryStore, k: &str) {
    record_incident(
      store,
      &user("prefect", Role::DisciplineOfficer),
      NewIncident {
        student_key: key(k),
        category:    IncidentCategory::Uniform,
        description: String::new(),
      },
      chrono::Utc::now(),
      T,
    )
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn file_combines_directory_notice_and_incidents() {
    let store = MemoryStore::new();
    store.enroll(student("A-1", "Ana", AccessStatus::Blocked));
    store.put_notice(notice_for("A-1", "Bring your parent", NoticePriority::High));
    incident(&store, "A-1").await;
    incident(&store, "A-1").await;

    let file = student_file(&store, &key("A-1"), T).await.unwrap();
    assert_eq!(file.student.name, "Ana");
    assert!(file.student.is_blocked());
    assert_eq!(file.notice.unwrap().message, "Bring your parent");
    assert_eq!(file.incidents.len(), 2);
    assert_eq!(file.incidents[0].tier, Tier::Second);
    assert_eq!(file.next_tier, Tier::Third);
  }

  #[tokio::test]
  async fn file_for_unknown_student() {
    let store = MemoryStore::new();
    let err = student_file(&store, &key("Z-9"), T).await.unwrap_err();
    assert!(matches!(err, Error::StudentNotFound(k) if k.as_str() == "Z-9"));
  }

  #[tokio::test]
  async fn file_survives_notice_outage() {
    let store = MemoryStore::new();
    store.enroll(student("A-1", "Ana", AccessStatus::Active));
    store.fail_notice_reads(true);

    let file = student_file(&store, &key("A-1"), T).await.unwrap();
    assert!(file.notice.is_none());
    assert_eq!(file.next_tier, Tier::First);
  }

  #[tokio::test]
  async fn history_lists_scans_newest_first() {
    let store = Arc::new(MemoryStore::new());
    store.enroll(student("A-1", "Ana", AccessStatus::Active));
    let p = AccessProcessor::new(store.clone(), ScanPolicy::default());
    let kiosk = user("k", Role::KioskOperator);
    for day in [1, 2] {
      let at = NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(7, 0, 0).unwrap();
      p.process_scan("A-1", &kiosk, at).await.unwrap();
    }

    let events = access_history(&*store, &key("A-1"), T).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
  }

  #[tokio::test]
  async fn history_outage_is_infrastructure() {
    let store = MemoryStore::new();
    store.fail_log_reads(true);
    let err = access_history(&store, &key("A-1"), T).await.unwrap_err();
    assert!(matches!(err, Error::AccessLogUnavailable(_)));
    assert!(err.is_infrastructure());

    store.fail_reads(true);
    let err = incident_log(&store, T).await.unwrap_err();
    assert!(err.is_infrastructure());
  }
}
