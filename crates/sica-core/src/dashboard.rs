//! Aggregates for the director's dashboard.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::{
  Error, Result,
  discipline::{DisciplinaryRecord, Tier},
  key::StudentKey,
  store::{AccessLogStore, DisciplinaryStore, StudentDirectory, bounded},
  student::Student,
};

/// Label for incidents whose student is no longer in the directory.
pub const UNASSIGNED_GROUP: &str = "unassigned";

/// Granted entries on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
  pub date:  NaiveDate,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub total_entries:      u64,
  pub total_incidents:    u64,
  /// Incidents stamped [`Tier::Report`].
  pub report_incidents:   u64,
  /// Incident count per student group, keyed by group label.
  pub incidents_by_group: BTreeMap<String, u64>,
  /// Granted entries per day, oldest first.
  pub entries_by_day:     Vec<DailyCount>,
}

/// Combine directory, access log and incident data into one summary.
pub fn summarize(
  students: &[Student],
  mut entries_by_day: Vec<DailyCount>,
  records: &[DisciplinaryRecord],
) -> DashboardSummary {
  let groups: HashMap<&StudentKey, &str> =
    students.iter().map(|s| (&s.key, s.group.as_str())).collect();

  let mut incidents_by_group = BTreeMap::new();
  for record in records {
    let group = groups
      .get(&record.student_key)
      .copied()
      .filter(|g| !g.trim().is_empty())
      .unwrap_or(UNASSIGNED_GROUP);
    *incidents_by_group.entry(group.to_owned()).or_insert(0) += 1;
  }

  entries_by_day.sort_by_key(|d| d.date);

  DashboardSummary {
    total_entries: entries_by_day.iter().map(|d| d.count).sum(),
    total_incidents: records.len() as u64,
    report_incidents: records.iter().filter(|r| r.tier == Tier::Report).count() as u64,
    incidents_by_group,
    entries_by_day,
  }
}

/// Read everything the dashboard needs and summarise it.
pub async fn load_dashboard<S>(store: &S, timeout: Duration) -> Result<DashboardSummary>
where
  S: StudentDirectory + AccessLogStore + DisciplinaryStore,
{
  let students = bounded(timeout, store.list_students())
    .await
    .map_err(Error::DirectoryUnavailable)?;
  let entries = bounded(timeout, store.daily_granted_counts())
    .await
    .map_err(Error::AccessLogUnavailable)?;
  let records = bounded(timeout, store.list_records())
    .await
    .map_err(Error::DirectoryUnavailable)?;

  Ok(summarize(&students, entries, &records))
}
