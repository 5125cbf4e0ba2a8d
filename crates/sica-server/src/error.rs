//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Access denials never reach this type; they are `200` verdict bodies.
//! Infrastructure failures are `503` with `"kind": "infrastructure"` so a
//! terminal can tell "system down" apart from "not allowed in".

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] sica_core::Error),

  #[error("missing or malformed session token")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),
}

/// Errors raised while turning a [`ServerConfig`](crate::ServerConfig) into
/// running state.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("utc_offset_minutes out of range: {0}")]
  UtcOffset(i32),

  #[error("write_attempts must be at least 1")]
  WriteAttempts,

  #[error("session_idle_minutes must be a positive number of minutes: {0}")]
  SessionIdle(i64),
}

impl ApiError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    use sica_core::Error as E;
    match self {
      ApiError::Core(e) if e.is_infrastructure() => {
        (StatusCode::SERVICE_UNAVAILABLE, "infrastructure")
      }
      ApiError::Core(E::StudentNotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::Core(E::EmptyKey | E::InvalidInput(_)) | ApiError::BadRequest(_) => {
        (StatusCode::BAD_REQUEST, "bad_request")
      }
      ApiError::Core(E::InvalidCredentials | E::SessionExpired) | ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "unauthorized")
      }
      ApiError::Core(E::Forbidden { .. }) => (StatusCode::FORBIDDEN, "forbidden"),
      ApiError::Core(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    if status.is_server_error() {
      tracing::error!(error = %self, kind, "request failed");
    }
    (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sica_core::{
    Error,
    role::{Capability, Role},
  };

  fn status(e: ApiError) -> StatusCode { e.into_response().status() }

  #[test]
  fn maps_core_errors() {
    let boxed = || -> sica_core::BoxError { "down".into() };

    assert_eq!(status(Error::DirectoryUnavailable(boxed()).into()), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status(Error::AccessLogUnavailable(boxed()).into()), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status(Error::EmptyKey.into()), StatusCode::BAD_REQUEST);
    assert_eq!(status(Error::InvalidCredentials.into()), StatusCode::UNAUTHORIZED);
    assert_eq!(status(Error::SessionExpired.into()), StatusCode::UNAUTHORIZED);
    assert_eq!(
      status(
        Error::Forbidden { role: Role::KioskOperator, capability: Capability::ViewDashboard }
          .into()
      ),
      StatusCode::FORBIDDEN
    );
    assert_eq!(status(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
  }
}
