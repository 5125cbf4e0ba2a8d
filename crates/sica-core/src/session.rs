//! Staff identities and the per-terminal session.
//!
//! A [`Session`] is an explicit value created by [`Session::login`] and
//! dropped on logout or idle expiry. Nothing about it is global; callers
//! hand it to whatever needs to know who is operating the terminal.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  pin::hash_pin,
  role::{Capability, Role, allowed_capabilities},
  store::{UserDirectory, bounded},
};

/// An authenticated staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub session_id:  Uuid,
  pub user:        User,
  pub started_at:  DateTime<Utc>,
  pub last_active: DateTime<Utc>,
  /// The menu entry the operator is on. Always one of `capabilities()`.
  pub selection:   Capability,
}

impl Session {
  /// Check credentials against `users` and open a session.
  ///
  /// Unknown usernames and wrong PINs are indistinguishable to the caller.
  /// A directory failure, including exceeding `timeout`, is reported as
  /// [`Error::DirectoryUnavailable`].
  pub async fn login<U: UserDirectory>(
    users: &U,
    username: &str,
    pin: &str,
    now: DateTime<Utc>,
    timeout: std::time::Duration,
  ) -> Result<Self> {
    let lookup = users.authenticate(username.trim().to_owned(), pin.trim().to_owned());
    let user = bounded(timeout, lookup)
      .await
      .map_err(Error::DirectoryUnavailable)?
      .ok_or(Error::InvalidCredentials)?;

    tracing::info!(user = %user.username, role = %user.role, "session opened");
    Ok(Self::begin(user, now))
  }

  /// Open a session for an already-authenticated user.
  pub fn begin(user: User, now: DateTime<Utc>) -> Self {
    let selection = allowed_capabilities(user.role)
      .into_iter()
      .next()
      .unwrap_or(Capability::ScanAccess);

    Self {
      session_id: Uuid::new_v4(),
      user,
      started_at: now,
      last_active: now,
      selection,
    }
  }

  pub fn role(&self) -> Role { self.user.role }

  pub fn capabilities(&self) -> BTreeSet<Capability> { allowed_capabilities(self.user.role) }

  pub fn can(&self, capability: Capability) -> bool {
    self.capabilities().contains(&capability)
  }

  /// Fail with [`Error::Forbidden`] unless the role grants `capability`.
  pub fn require(&self, capability: Capability) -> Result<()> {
    if self.can(capability) {
      Ok(())
    } else {
      Err(Error::Forbidden { role: self.role(), capability })
    }
  }

  /// Move the navigation selection. Only permitted entries can be selected.
  pub fn select(&mut self, capability: Capability) -> Result<()> {
    self.require(capability)?;
    self.selection = capability;
    Ok(())
  }

  pub fn touch(&mut self, now: DateTime<Utc>) { self.last_active = now; }

  pub fn is_expired(&self, now: DateTime<Utc>, idle: Duration) -> bool {
    now - self.last_active > idle
  }
}

/// Create or replace a staff account. Only the argon2 hash of `pin` is
/// handed to the directory.
pub async fn provision_user<U: UserDirectory>(
  users: &U,
  user: User,
  pin: &str,
  timeout: std::time::Duration,
) -> Result<User> {
  let username = user.username.trim();
  if username.is_empty() || username.contains(char::is_whitespace) {
    return Err(Error::InvalidInput("username must be a single word".into()));
  }
  if user.role == Role::Unrecognized {
    return Err(Error::InvalidInput("unknown role".into()));
  }
  let pin = pin.trim();
  if pin.is_empty() {
    return Err(Error::InvalidInput("pin must not be empty".into()));
  }

  let user = User {
    username: username.to_owned(),
    display_name: user.display_name.trim().to_owned(),
    role: user.role,
  };
  let hash = hash_pin(pin)?;
  bounded(timeout, users.add_user(user.clone(), hash))
    .await
    .map_err(Error::StoreWriteFailed)?;

  tracing::info!(user = %user.username, role = %user.role, "account provisioned");
  Ok(user)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{MemoryStore, user};

  const T: std::time::Duration = std::time::Duration::from_millis(200);

  #[tokio::test]
  async fn login_checks_pin() {
    let store = MemoryStore::new();
    store.add_account(user("kiosk1", Role::KioskOperator), &hash_pin("1234").unwrap());

    let session = Session::login(&store, "kiosk1", "1234", Utc::now(), T).await.unwrap();
    assert_eq!(session.user.username, "kiosk1");
    assert_eq!(session.selection, Capability::ScanAccess);

    let err = Session::login(&store, "kiosk1", "0000", Utc::now(), T).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));

    let err = Session::login(&store, "nobody", "1234", Utc::now(), T).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
  }

  #[tokio::test]
  async fn login_reports_directory_failure() {
    let store = MemoryStore::new();
    store.fail_reads(true);
    let err = Session::login(&store, "kiosk1", "1234", Utc::now(), T).await.unwrap_err();
    assert!(err.is_infrastructure());
  }

  #[tokio::test]
  async fn slow_user_directory_times_out() {
    let store = MemoryStore::new();
    store.add_account(user("kiosk1", Role::KioskOperator), &hash_pin("1234").unwrap());
    store.delay_reads(std::time::Duration::from_secs(5));

    let err = Session::login(&store, "kiosk1", "1234", Utc::now(), std::time::Duration::from_millis(20))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::DirectoryUnavailable(_)));
  }

  #[test]
  fn default_selection_is_first_menu_entry() {
    let s = Session::begin(user("d", Role::DisciplineOfficer), Utc::now());
    assert_eq!(s.selection, Capability::RecordIncident);
  }

  #[test]
  fn select_only_allowed() {
    let mut s = Session::begin(user("dir", Role::Director), Utc::now());
    s.select(Capability::ViewAcademic).unwrap();
    assert_eq!(s.selection, Capability::ViewAcademic);

    let err = s.select(Capability::ScanAccess).unwrap_err();
    assert!(matches!(
      err,
      Error::Forbidden { role: Role::Director, capability: Capability::ScanAccess }
    ));
    assert_eq!(s.selection, Capability::ViewAcademic);
  }

  #[test]
  fn idle_expiry() {
    let start = Utc::now();
    let mut s = Session::begin(user("k", Role::KioskOperator), start);
    let idle = Duration::minutes(30);

    assert!(!s.is_expired(start + Duration::minutes(29), idle));
    assert!(s.is_expired(start + Duration::minutes(31), idle));

    s.touch(start + Duration::minutes(20));
    assert!(!s.is_expired(start + Duration::minutes(31), idle));
  }

  #[tokio::test]
  async fn provisioned_user_can_log_in() {
    let store = MemoryStore::new();
    let t = std::time::Duration::from_millis(200);

    let created = provision_user(&store, user(" prefect ", Role::DisciplineOfficer), "4321", t)
      .await
      .unwrap();
    assert_eq!(created.username, "prefect");

    let session = Session::login(&store, "prefect", "4321", Utc::now(), T).await.unwrap();
    assert_eq!(session.role(), Role::DisciplineOfficer);
  }

  #[tokio::test]
  async fn provisioning_rejects_bad_input() {
    let store = MemoryStore::new();
    let t = std::time::Duration::from_millis(200);

    for (name, role, pin) in [
      ("", Role::Director, "1"),
      ("two words", Role::Director, "1"),
      ("x", Role::Unrecognized, "1"),
      ("x", Role::Director, "  "),
    ] {
      let err = provision_user(&store, user(name, role), pin, t).await.unwrap_err();
      assert!(matches!(err, Error::InvalidInput(_)), "{name:?} {role:?} {pin:?}");
    }
  }
}
