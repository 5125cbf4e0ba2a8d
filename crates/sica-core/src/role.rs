//! Role authorisation gate.
//!
//! Roles are assigned out of band and arrive as free-form labels from the
//! user directory. [`Role::parse`] never fails: anything it does not
//! recognise becomes [`Role::Unrecognized`], which is granted the same
//! minimal capability set as a kiosk operator.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator as _, IntoStaticStr};

/// A menu action or API operation a staff member may invoke.
///
/// Declaration order is menu order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
  /// Operate the entry gate scanner.
  ScanAccess,
  ViewDashboard,
  RecordIncident,
  ViewHistory,
  IssueNotice,
  /// Services and technical follow-up of recorded incidents.
  ManagePractica,
  /// The digital student file.
  ViewAcademic,
  /// Block or unblock a student's access.
  ManageAccess,
  ManageUsers,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  KioskOperator,
  Director,
  DisciplineOfficer,
  Registrar,
  Administrator,
  /// A label the gate does not know. Fails safe to the minimal set.
  Unrecognized,
}

impl Role {
  /// Map a directory role label to a [`Role`], case-insensitively.
  pub fn parse(label: &str) -> Self {
    match label.trim().to_ascii_lowercase().as_str() {
      "kiosk" | "kiosko" | "kiosk_operator" => Self::KioskOperator,
      "director" => Self::Director,
      "prefecto" | "discipline_officer" => Self::DisciplineOfficer,
      "general" | "registrar" => Self::Registrar,
      "admin" | "administrator" => Self::Administrator,
      _ => Self::Unrecognized,
    }
  }

  /// The canonical label stored by backends.
  pub fn label(self) -> &'static str { self.into() }

  pub fn capabilities(self) -> BTreeSet<Capability> { allowed_capabilities(self) }
}

impl<'de> Deserialize<'de> for Role {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let label = String::deserialize(d)?;
    Ok(Self::parse(&label))
  }
}

/// The capabilities granted to `role`. Total and deterministic; every role
/// maps to a non-empty set.
pub fn allowed_capabilities(role: Role) -> BTreeSet<Capability> {
  use Capability::*;

  match role {
    Role::KioskOperator | Role::Unrecognized => BTreeSet::from([ScanAccess]),
    Role::Director => BTreeSet::from([ViewDashboard, ViewAcademic, ManageAccess]),
    Role::DisciplineOfficer => {
      BTreeSet::from([RecordIncident, ViewHistory, IssueNotice, ViewAcademic])
    }
    Role::Registrar => {
      BTreeSet::from([RecordIncident, IssueNotice, ManagePractica, ViewAcademic])
    }
    Role::Administrator => Capability::iter().collect(),
  }
}
