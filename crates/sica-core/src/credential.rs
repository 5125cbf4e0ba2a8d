//! Self-service credential check.
//!
//! Students look themselves up to obtain the payload their digital ID
//! encodes. Blocked students are told to see the office instead.

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::{
  Result,
  key::{NormalizedKey, StudentKey, normalize},
  student::{Resolution, resolve},
  store::StudentDirectory,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CredentialStatus {
  Empty,
  NotFound,
  /// On administrative hold; no credential is issued.
  Restricted,
  /// `payload` is the exact string a scanner must read back.
  Issuable { payload: StudentKey, name: String },
}

pub async fn check_credential<D: StudentDirectory>(
  directory: &D,
  raw: &str,
  timeout: Duration,
) -> Result<CredentialStatus> {
  let NormalizedKey::Key(key) = normalize(raw) else {
    return Ok(CredentialStatus::Empty);
  };

  Ok(match resolve(directory, &key, timeout).await? {
    Resolution::NotFound => CredentialStatus::NotFound,
    Resolution::FoundBlocked(_) => CredentialStatus::Restricted,
    Resolution::FoundActive(s) => CredentialStatus::Issuable { payload: s.key, name: s.name },
  })
}
