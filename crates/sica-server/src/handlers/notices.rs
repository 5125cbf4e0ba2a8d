//! Handlers for notices shown at the gate.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/api/notices` | Body: `{"student_key","message","priority"}`; replaces the active notice |
//! | `DELETE` | `/api/notices/{id}` | Deactivates one notice |
//! | `DELETE` | `/api/students/{key}/notices` | Deactivates every notice for a student |
//!
//! All require `issue_notice`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use sica_core::{
  key::StudentKey,
  notice::{NewNotice, Notice, clear_notices, issue_notice},
  role::Capability,
  store::{NoticeTarget, SicaStore},
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Serialize)]
pub struct Cleared {
  pub cleared: u64,
}

/// `POST /api/notices`: returns 201 + the new notice.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Json(body): Json<NewNotice>,
) -> Result<(StatusCode, Json<Notice>), ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::IssueNotice)?;
  let notice =
    issue_notice(&*state.store, &session.user, body, Utc::now(), state.io_timeout()).await?;
  Ok((StatusCode::CREATED, Json(notice)))
}

/// `DELETE /api/notices/{id}`
pub async fn clear_one<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Cleared>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::IssueNotice)?;
  let cleared = clear_notices(&*state.store, NoticeTarget::Id(id), state.io_timeout()).await?;
  Ok(Json(Cleared { cleared }))
}

/// `DELETE /api/students/{key}/notices`
pub async fn clear_student<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(raw): Path<String>,
) -> Result<Json<Cleared>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::IssueNotice)?;
  let key = StudentKey::parse(&raw)?;
  let cleared =
    clear_notices(&*state.store, NoticeTarget::Student(key), state.io_timeout()).await?;
  Ok(Json(Cleared { cleared }))
}
