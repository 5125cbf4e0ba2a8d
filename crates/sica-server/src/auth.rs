//! Process-local session registry and the bearer-token extractor.
//!
//! A terminal logs in once and sends `Authorization: Bearer <session id>`
//! on every later request. Sessions live only in memory; a restart logs
//! every terminal out.

use std::collections::HashMap;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use sica_core::{Error, role::Capability, session::Session, store::SicaStore};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Open sessions keyed by session id.
pub struct SessionRegistry {
  sessions: Mutex<HashMap<Uuid, Session>>,
  idle:     Duration,
}

impl SessionRegistry {
  pub fn new(idle: Duration) -> Self {
    Self { sessions: Mutex::new(HashMap::new()), idle }
  }

  pub async fn insert(&self, session: Session) {
    self.sessions.lock().await.insert(session.session_id, session);
  }

  /// Look a session up and mark it active. An idle-expired session is
  /// dropped and reported as [`Error::SessionExpired`].
  pub async fn resume(&self, id: Uuid, now: DateTime<Utc>) -> Result<Session, ApiError> {
    let mut sessions = self.sessions.lock().await;
    let Some(session) = sessions.get_mut(&id) else {
      return Err(ApiError::Unauthorized);
    };
    if session.is_expired(now, self.idle) {
      tracing::info!(user = %session.user.username, "session expired");
      sessions.remove(&id);
      return Err(Error::SessionExpired.into());
    }
    session.touch(now);
    Ok(session.clone())
  }

  pub async fn select(&self, id: Uuid, capability: Capability) -> Result<Session, ApiError> {
    let mut sessions = self.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::Unauthorized)?;
    session.select(capability)?;
    Ok(session.clone())
  }

  /// Returns the removed session, if there was one.
  pub async fn remove(&self, id: Uuid) -> Option<Session> {
    self.sessions.lock().await.remove(&id)
  }

  /// Drop every idle-expired session. Returns how many were dropped.
  pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
    let mut sessions = self.sessions.lock().await;
    let before = sessions.len();
    sessions.retain(|_, s| !s.is_expired(now, self.idle));
    before - sessions.len()
  }
}

/// Extract the session id from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<Uuid, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  let token = value.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
  Uuid::parse_str(token.trim()).map_err(|_| ApiError::Unauthorized)
}

/// Present in a handler means the request carries a live session.
pub struct Authenticated(pub Session);

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: SicaStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = bearer_token(&parts.headers)?;
    let session = state.sessions.resume(id, Utc::now()).await?;
    Ok(Authenticated(session))
  }
}
