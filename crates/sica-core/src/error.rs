//! Error types for `sica-core`.
//!
//! Access verdicts are values, not errors: a denied scan is a successful
//! decision. The variants here are either infrastructure failures (which
//! callers must render differently from a denial) or request problems on
//! the staff-facing flows.

use thiserror::Error;

use crate::{
  key::StudentKey,
  role::{Capability, Role},
};

/// A type-erased backend error carried as the source of an infrastructure
/// failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The student directory could not be reached or did not answer in time.
  #[error("student directory unavailable: {0}")]
  DirectoryUnavailable(#[source] BoxError),

  /// The access log could not be read while checking for a same-day entry.
  #[error("access log unavailable: {0}")]
  AccessLogUnavailable(#[source] BoxError),

  /// The notice store could not be read.
  #[error("notice store unavailable: {0}")]
  NoticesUnavailable(#[source] BoxError),

  /// A store rejected or timed out on an append.
  #[error("store write failed: {0}")]
  StoreWriteFailed(#[source] BoxError),

  #[error("student not found: {0}")]
  StudentNotFound(StudentKey),

  #[error("student key is empty")]
  EmptyKey,

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid username or pin")]
  InvalidCredentials,

  #[error("session expired")]
  SessionExpired,

  #[error("role {role} may not use {capability}")]
  Forbidden { role: Role, capability: Capability },

  #[error("pin hashing failed: {0}")]
  PinHash(String),
}

impl Error {
  /// `true` for failures of a backing store, as opposed to request errors.
  /// Presentation layers use this to keep "system down" visually distinct
  /// from "access denied".
  pub fn is_infrastructure(&self) -> bool {
    matches!(
      self,
      Self::DirectoryUnavailable(_)
        | Self::AccessLogUnavailable(_)
        | Self::NoticesUnavailable(_)
        | Self::StoreWriteFailed(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
