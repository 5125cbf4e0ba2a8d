//! Notices and the notice lookup.
//!
//! A notice is an advisory shown to the gate operator when the student
//! scans in, e.g. "report to the director's office". At most one notice per
//! student is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
  Error, Result,
  key::StudentKey,
  session::User,
  store::{NoticeStore, NoticeTarget, bounded},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoticePriority {
  Low,
  #[default]
  Medium,
  High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub notice_id:   Uuid,
  pub student_key: StudentKey,
  pub message:     String,
  pub priority:    NoticePriority,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  /// Username of the staff member who issued it.
  pub created_by:  String,
}

/// Input to [`issue_notice`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotice {
  pub student_key: StudentKey,
  pub message:     String,
  #[serde(default)]
  pub priority:    NoticePriority,
}

/// The single active notice for `key`, if any.
///
/// If the store violates the one-active-notice invariant and returns several,
/// the most recently created wins; equal timestamps fall back to the greater
/// `notice_id` so the choice is stable across calls.
pub async fn active_notice<N: NoticeStore>(
  store: &N,
  key: &StudentKey,
  timeout: Duration,
) -> Result<Option<Notice>> {
  let candidates = bounded(timeout, store.find_active(key.clone()))
    .await
    .map_err(Error::NoticesUnavailable)?;

  Ok(pick_active(candidates))
}

fn pick_active(candidates: Vec<Notice>) -> Option<Notice> {
  candidates
    .into_iter()
    .filter(|n| n.active)
    .max_by(|a, b| {
      a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.notice_id.cmp(&b.notice_id))
    })
}

/// Publish a notice for a student, superseding any active one.
pub async fn issue_notice<N: NoticeStore>(
  store: &N,
  actor: &User,
  input: NewNotice,
  now: DateTime<Utc>,
  timeout: Duration,
) -> Result<Notice> {
  let message = input.message.trim();
  if message.is_empty() {
    return Err(Error::InvalidInput("notice message is empty".into()));
  }

  let notice = Notice {
    notice_id:   Uuid::new_v4(),
    student_key: input.student_key,
    message:     message.to_owned(),
    priority:    input.priority,
    active:      true,
    created_at:  now,
    created_by:  actor.username.clone(),
  };

  bounded(timeout, store.insert_notice(notice.clone()))
    .await
    .map_err(Error::StoreWriteFailed)?;

  tracing::info!(
    student = %notice.student_key,
    priority = %notice.priority,
    by = %notice.created_by,
    "notice issued"
  );
  Ok(notice)
}

/// Manually clear notices, by id or for every notice of a student.
pub async fn clear_notices<N: NoticeStore>(
  store: &N,
  target: NoticeTarget,
  timeout: Duration,
) -> Result<u64> {
  bounded(timeout, store.deactivate(target))
    .await
    .map_err(Error::StoreWriteFailed)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;
  use crate::testing::{MemoryStore, user};
  use crate::role::Role;

  const T: Duration = Duration::from_millis(200);

  fn notice(key: &str, message: &str, secs: i64) -> Notice {
    Notice {
      notice_id:   Uuid::new_v4(),
      student_key: StudentKey::parse(key).unwrap(),
      message:     message.into(),
      priority:    NoticePriority::High,
      active:      true,
      created_at:  Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
      created_by:  "staff".into(),
    }
  }

  #[test]
  fn pick_prefers_newest() {
    let old = notice("A-1", "old", 0);
    let new = notice("A-1", "new", 60);
    let picked = pick_active(vec![new.clone(), old.clone()]).unwrap();
    assert_eq!(picked.message, "new");
    let picked = pick_active(vec![old, new]).unwrap();
    assert_eq!(picked.message, "new");
  }

  #[test]
  fn pick_is_stable_on_equal_timestamps() {
    let a = notice("A-1", "a", 0);
    let b = notice("A-1", "b", 0);
    let first = pick_active(vec![a.clone(), b.clone()]).unwrap();
    let second = pick_active(vec![b, a]).unwrap();
    assert_eq!(first.notice_id, second.notice_id);
  }

  #[test]
  fn pick_ignores_inactive() {
    let mut n = notice("A-1", "gone", 0);
    n.active = false;
    assert!(pick_active(vec![n]).is_none());
  }

  #[tokio::test]
  async fn issuing_supersedes_previous() {
    let store = MemoryStore::new();
    let staff = user("prefect", Role::DisciplineOfficer);
    let key = StudentKey::parse("A-1").unwrap();

    for msg in ["first", "second"] {
      issue_notice(
        &store,
        &staff,
        NewNotice {
          student_key: key.clone(),
          message:     msg.into(),
          priority:    NoticePriority::Low,
        },
        Utc::now(),
        T,
      )
      .await
      .unwrap();
    }

    let active = active_notice(&store, &key, T).await.unwrap().unwrap();
    assert_eq!(active.message, "second");
    assert_eq!(store.notices().iter().filter(|n| n.active).count(), 1);
  }

  #[tokio::test]
  async fn blank_message_is_rejected() {
    let store = MemoryStore::new();
    let err = issue_notice(
      &store,
      &user("prefect", Role::DisciplineOfficer),
      NewNotice {
        student_key: StudentKey::parse("A-1").unwrap(),
        message:     "   ".into(),
        priority:    NoticePriority::Low,
      },
      Utc::now(),
      T,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
  }

  #[tokio::test]
  async fn clearing_by_student() {
    let store = MemoryStore::new();
    let key = StudentKey::parse("A-1").unwrap();
    store.put_notice(notice("A-1", "x", 0));

    let n = clear_notices(&store, NoticeTarget::Student(key.clone()), T).await.unwrap();
    assert_eq!(n, 1);
    assert!(active_notice(&store, &key, T).await.unwrap().is_none());
  }
}
