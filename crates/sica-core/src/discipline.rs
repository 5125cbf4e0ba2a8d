//! Disciplinary incidents and the escalation ladder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
  Error, Result,
  key::StudentKey,
  session::User,
  store::{DisciplinaryStore, StudentDirectory, bounded},
};

/// Severity stamped on an incident, in escalating order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
  First,
  Second,
  Third,
  /// Formal report; every incident from the fourth on.
  Report,
}

/// The tier for a new incident given how many the student already has.
///
/// Total over `i64`: negative counts are treated as zero.
pub fn next_tier(prior_count: i64) -> Tier {
  match prior_count {
    i64::MIN..=0 => Tier::First,
    1 => Tier::Second,
    2 => Tier::Third,
    _ => Tier::Report,
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentCategory {
  Uniform,
  Conduct,
  Tardiness,
  Phone,
  Other,
}

/// One incident entry. Append-only; `tier` is fixed at creation and never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplinaryRecord {
  pub record_id:   Uuid,
  pub student_key: StudentKey,
  pub category:    IncidentCategory,
  pub description: String,
  pub tier:        Tier,
  pub recorded_at: DateTime<Utc>,
  pub recorded_by: String,
}

/// Input to [`record_incident`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncident {
  pub student_key: StudentKey,
  pub category:    IncidentCategory,
  #[serde(default)]
  pub description: String,
}

/// Record an incident for an enrolled student, stamping its tier from the
/// number of incidents already on file.
pub async fn record_incident<S>(
  store: &S,
  actor: &User,
  input: NewIncident,
  now: DateTime<Utc>,
  timeout: Duration,
) -> Result<DisciplinaryRecord>
where
  S: StudentDirectory + DisciplinaryStore,
{
  let key = input.student_key;

  bounded(timeout, store.find_by_key(key.clone()))
    .await
    .map_err(Error::DirectoryUnavailable)?
    .ok_or_else(|| Error::StudentNotFound(key.clone()))?;

  let prior = bounded(timeout, store.count_by_key(key.clone()))
    .await
    .map_err(Error::DirectoryUnavailable)?;
  let tier = next_tier(i64::try_from(prior).unwrap_or(i64::MAX));

  let record = DisciplinaryRecord {
    record_id: Uuid::new_v4(),
    student_key: key,
    category: input.category,
    description: input.description.trim().to_owned(),
    tier,
    recorded_at: now,
    recorded_by: actor.username.clone(),
  };

  bounded(timeout, store.append_record(record.clone()))
    .await
    .map_err(Error::StoreWriteFailed)?;

  tracing::info!(
    student = %record.student_key,
    category = %record.category,
    tier = %record.tier,
    prior,
    by = %record.recorded_by,
    "incident recorded"
  );
  Ok(record)
}
