//! JSON HTTP API for SICA kiosks and staff terminals.
//!
//! Exposes an axum [`Router`] backed by any [`SicaStore`]. Terminals log in
//! with a username and PIN, then present the returned session id as a
//! bearer token. Every operation past login checks the session's role
//! against the capability it needs.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ConfigError};

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use chrono::{FixedOffset, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;
use sica_core::{
  access::{AccessProcessor, ScanPolicy},
  store::SicaStore,
};
use tokio::time::Duration;
use tower_http::trace::TraceLayer;

use auth::SessionRegistry;
use handlers::{credential, dashboard, incidents, notices, scan, session, students, users};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `sica.toml` and `SICA_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Campus local time as an offset from UTC. Decides which calendar day a
  /// scan belongs to.
  pub utc_offset_minutes:   i32,
  /// Upper bound on any single store call.
  pub io_timeout_ms:        u64,
  /// How many times an audit write is attempted before it is abandoned.
  pub write_attempts:       u32,
  pub session_idle_minutes: i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_string(),
      port:                 8420,
      store_path:           PathBuf::from("~/.local/share/sica/sica.db"),
      utc_offset_minutes:   -360,
      io_timeout_ms:        2000,
      write_attempts:       2,
      session_idle_minutes: 30,
    }
  }
}

impl ServerConfig {
  pub fn io_timeout(&self) -> Duration { Duration::from_millis(self.io_timeout_ms) }

  pub fn scan_policy(&self) -> Result<ScanPolicy, ConfigError> {
    if self.write_attempts == 0 {
      return Err(ConfigError::WriteAttempts);
    }
    Ok(ScanPolicy {
      io_timeout:     self.io_timeout(),
      write_attempts: self.write_attempts,
    })
  }

  pub fn local_offset(&self) -> Result<FixedOffset, ConfigError> {
    self
      .utc_offset_minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .ok_or(ConfigError::UtcOffset(self.utc_offset_minutes))
  }

  /// How long a session may sit unused before it expires.
  pub fn session_idle(&self) -> Result<TimeDelta, ConfigError> {
    let minutes = self.session_idle_minutes;
    if minutes <= 0 {
      return Err(ConfigError::SessionIdle(minutes));
    }
    TimeDelta::try_minutes(minutes).ok_or(ConfigError::SessionIdle(minutes))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:     Arc<S>,
  pub processor: Arc<AccessProcessor<S>>,
  pub sessions:  Arc<SessionRegistry>,
  pub config:    Arc<ServerConfig>,
  offset:        FixedOffset,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      processor: self.processor.clone(),
      sessions:  self.sessions.clone(),
      config:    self.config.clone(),
      offset:    self.offset,
    }
  }
}

impl<S: SicaStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Result<Self, ConfigError> {
    let policy = config.scan_policy()?;
    let offset = config.local_offset()?;
    let idle = config.session_idle()?;
    Ok(Self {
      processor: Arc::new(AccessProcessor::new(store.clone(), policy)),
      sessions: Arc::new(SessionRegistry::new(idle)),
      config: Arc::new(config),
      store,
      offset,
    })
  }

  /// The current wall-clock time on campus.
  pub fn local_now(&self) -> NaiveDateTime {
    Utc::now().with_timezone(&self.offset).naive_local()
  }

  pub fn io_timeout(&self) -> Duration { self.config.io_timeout() }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SicaStore + 'static,
{
  Router::new()
    // Session
    .route("/api/login", post(session::login::<S>))
    .route("/api/logout", post(session::logout::<S>))
    .route("/api/session", get(session::current))
    .route("/api/session/selection", put(session::select::<S>))
    // Gate
    .route("/api/scan", post(scan::handler::<S>))
    .route("/api/credential/{raw}", get(credential::handler::<S>))
    // Students
    .route("/api/students/{key}", get(students::file::<S>))
    .route("/api/students/{key}/access", put(students::set_access::<S>))
    .route("/api/students/{key}/history", get(students::history::<S>))
    .route("/api/students/{key}/incidents", get(students::incidents::<S>))
    .route("/api/students/{key}/notices", delete(notices::clear_student::<S>))
    // Incidents and notices
    .route("/api/incidents", get(incidents::list::<S>).post(incidents::create::<S>))
    .route("/api/notices", post(notices::create::<S>))
    .route("/api/notices/{id}", delete(notices::clear_one::<S>))
    // Administration
    .route("/api/dashboard", get(dashboard::handler::<S>))
    .route("/api/users", post(users::create::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
