//! The access event processor: one scan in, one verdict out.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
  Error, Result,
  key::{NormalizedKey, StudentKey, normalize},
  notice::{Notice, active_notice},
  session::User,
  store::{AccessLogStore, AppendOutcome, NoticeStore, StudentDirectory, bounded},
  student::{Resolution, Student, resolve},
};

// ─── Audit record ────────────────────────────────────────────────────────────

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
pub enum AccessOutcome {
  Granted,
  DeniedUnknown,
  DeniedBlocked,
  /// Never written: a same-day repeat leaves the log untouched.
  DeniedDuplicate,
}

/// One scan outcome recorded for audit. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
  pub event_id:    Uuid,
  /// The matched student; `None` when the credential matched nobody.
  pub student_key: Option<StudentKey>,
  /// The normalised credential as scanned.
  pub credential:  StudentKey,
  pub date:        NaiveDate,
  pub time:        NaiveTime,
  pub outcome:     AccessOutcome,
  /// Username of the operator on the terminal.
  pub recorded_by: String,
}

// ─── Verdict ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DenialReason {
  /// The credential matched no enrolled student.
  Unknown,
  /// The student is on administrative hold.
  Blocked,
  /// The student already entered today. Duplicate suppression, not a fault.
  AlreadyRegisteredToday,
}

/// What the gate shows for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum AccessVerdict {
  /// Empty input. Render nothing.
  NoOp,
  Granted {
    student_name: String,
    group:        String,
    notice:       Option<Notice>,
  },
  Denied {
    reason:       DenialReason,
    student_name: Option<String>,
  },
}

impl AccessVerdict {
  pub fn is_granted(&self) -> bool { matches!(self, Self::Granted { .. }) }

  pub fn denial(&self) -> Option<DenialReason> {
    match self {
      Self::Denied { reason, .. } => Some(*reason),
      _ => None,
    }
  }

  fn already_registered(student: Student) -> Self {
    Self::Denied {
      reason:       DenialReason::AlreadyRegisteredToday,
      student_name: Some(student.name),
    }
  }
}

// ─── Processor ───────────────────────────────────────────────────────────────

/// Bounds applied to every store call made while processing a scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanPolicy {
  /// Upper bound on each lookup or write.
  pub io_timeout:     Duration,
  /// How many times the access event append is attempted. The store
  /// deduplicates grants, so repeating a write cannot record a second one.
  pub write_attempts: u32,
}

impl Default for ScanPolicy {
  fn default() -> Self {
    Self {
      io_timeout:     Duration::from_secs(2),
      write_attempts: 2,
    }
  }
}

/// Turns raw scanner input into a verdict and at most one audit event.
pub struct AccessProcessor<S> {
  store:  Arc<S>,
  policy: ScanPolicy,
}

impl<S> AccessProcessor<S>
where
  S: StudentDirectory + AccessLogStore + NoticeStore,
{
  pub fn new(store: Arc<S>, policy: ScanPolicy) -> Self { Self { store, policy } }

  pub fn policy(&self) -> ScanPolicy { self.policy }

  /// Process one scan made by `actor` at local time `at`.
  ///
  /// Denials are `Ok` verdicts. `Err` is reserved for infrastructure
  /// failures that prevent a decision: an unreachable directory, or an
  /// unreadable access log when checking for an earlier entry today. A
  /// failed audit write after the decision is logged and does not change
  /// the verdict.
  pub async fn process_scan(
    &self,
    raw: &str,
    actor: &User,
    at: NaiveDateTime,
  ) -> Result<AccessVerdict> {
    let NormalizedKey::Key(key) = normalize(raw) else {
      return Ok(AccessVerdict::NoOp);
    };

    let timeout = self.policy.io_timeout;
    let verdict = match resolve(&*self.store, &key, timeout).await? {
      Resolution::NotFound => {
        self
          .record(self.event(None, key.clone(), at, AccessOutcome::DeniedUnknown, actor))
          .await;
        AccessVerdict::Denied { reason: DenialReason::Unknown, student_name: None }
      }

      Resolution::FoundBlocked(student) => {
        self
          .record(self.event(
            Some(student.key.clone()),
            key.clone(),
            at,
            AccessOutcome::DeniedBlocked,
            actor,
          ))
          .await;
        AccessVerdict::Denied {
          reason:       DenialReason::Blocked,
          student_name: Some(student.name),
        }
      }

      Resolution::FoundActive(student) => self.admit(student, key.clone(), at, actor).await?,
    };

    tracing::info!(
      credential = %key,
      by = %actor.username,
      verdict = ?verdict.denial(),
      granted = verdict.is_granted(),
      "scan processed"
    );
    Ok(verdict)
  }

  async fn admit(
    &self,
    student: Student,
    key: StudentKey,
    at: NaiveDateTime,
    actor: &User,
  ) -> Result<AccessVerdict> {
    let timeout = self.policy.io_timeout;

    let seen_today = bounded(timeout, self.store.has_granted_event(student.key.clone(), at.date()))
      .await
      .map_err(Error::AccessLogUnavailable)?;
    if seen_today {
      return Ok(AccessVerdict::already_registered(student));
    }

    let notice = match active_notice(&*self.store, &student.key, timeout).await {
      Ok(notice) => notice,
      Err(e) => {
        tracing::warn!(student = %student.key, error = %e, "notice lookup failed; admitting without notice");
        None
      }
    };

    let event = self.event(Some(student.key.clone()), key, at, AccessOutcome::Granted, actor);
    if self.record(event).await == Some(AppendOutcome::DuplicateDay) {
      // Another terminal recorded this student's entry between our check
      // and our write.
      return Ok(AccessVerdict::already_registered(student));
    }

    Ok(AccessVerdict::Granted {
      student_name: student.name,
      group: student.group,
      notice,
    })
  }

  fn event(
    &self,
    student_key: Option<StudentKey>,
    credential: StudentKey,
    at: NaiveDateTime,
    outcome: AccessOutcome,
    actor: &User,
  ) -> AccessEvent {
    AccessEvent {
      event_id: Uuid::new_v4(),
      student_key,
      credential,
      date: at.date(),
      time: at.time(),
      outcome,
      recorded_by: actor.username.clone(),
    }
  }

  /// Append `event`, retrying up to the policy's attempt count.
  ///
  /// Returns `None` if every attempt failed. `ReplayedId` is reported as
  /// `Appended`: an earlier attempt landed without being acknowledged.
  /// `DuplicateDay` is passed through even on a retry, since it means some
  /// other grant holds the day.
  async fn record(&self, event: AccessEvent) -> Option<AppendOutcome> {
    let attempts = self.policy.write_attempts.max(1);

    for attempt in 1..=attempts {
      match bounded(self.policy.io_timeout, self.store.append_event(event.clone())).await {
        Ok(AppendOutcome::ReplayedId) => return Some(AppendOutcome::Appended),
        Ok(outcome) => return Some(outcome),
        Err(e) if attempt < attempts => {
          tracing::warn!(event = %event.event_id, attempt, error = %e, "access event write failed; retrying");
        }
        Err(e) => {
          tracing::error!(
            event = %event.event_id,
            credential = %event.credential,
            outcome = %event.outcome,
            error = %e,
            "access event write abandoned"
          );
        }
      }
    }
    None
  }
}
