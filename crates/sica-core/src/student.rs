//! Students and the student resolver.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tokio::time::Duration;

use crate::{
  Error, Result,
  key::StudentKey,
  store::{StudentDirectory, bounded},
};

/// Whether a student may currently pass the gate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessStatus {
  #[default]
  Active,
  /// Administrative hold. Takes precedence over every other check.
  Blocked,
}

/// A directory entry. Created and updated by the enrollment process; the
/// kiosk only reads it and, on explicit staff action, flips `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub key:    StudentKey,
  pub name:   String,
  /// Group or cohort label, e.g. `"4AMEC"`.
  pub group:  String,
  #[serde(default)]
  pub status: AccessStatus,
}

impl Student {
  pub fn is_blocked(&self) -> bool { self.status == AccessStatus::Blocked }
}

/// Outcome of looking a key up in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  NotFound,
  FoundActive(Student),
  FoundBlocked(Student),
}

/// Exact-match lookup of an already-normalised key.
///
/// Any directory failure, including exceeding `timeout`, surfaces as
/// [`Error::DirectoryUnavailable`] and never as [`Resolution::NotFound`].
pub async fn resolve<D: StudentDirectory>(
  directory: &D,
  key: &StudentKey,
  timeout: Duration,
) -> Result<Resolution> {
  let found = bounded(timeout, directory.find_by_key(key.clone()))
    .await
    .map_err(Error::DirectoryUnavailable)?;

  Ok(match found {
    None => Resolution::NotFound,
    Some(s) if s.is_blocked() => Resolution::FoundBlocked(s),
    Some(s) => Resolution::FoundActive(s),
  })
}

/// Flip a student's access flag on explicit staff action.
pub async fn set_access<D: StudentDirectory>(
  directory: &D,
  key: &StudentKey,
  status: AccessStatus,
  timeout: Duration,
) -> Result<()> {
  let found = bounded(timeout, directory.set_access_status(key.clone(), status))
    .await
    .map_err(Error::StoreWriteFailed)?;
  if !found {
    return Err(Error::StudentNotFound(key.clone()));
  }
  tracing::info!(student = %key, %status, "access status changed");
  Ok(())
}

/// Upsert an enrollment feed into the directory. Returns how many entries
/// were written; stops at the first failure.
pub async fn import_students<D: StudentDirectory>(
  directory: &D,
  students: Vec<Student>,
  timeout: Duration,
) -> Result<usize> {
  let mut written = 0;
  for student in students {
    if student.name.trim().is_empty() {
      return Err(Error::InvalidInput(format!("student {} has no name", student.key)));
    }
    bounded(timeout, directory.upsert_student(student))
      .await
      .map_err(Error::StoreWriteFailed)?;
    written += 1;
  }
  Ok(written)
}
