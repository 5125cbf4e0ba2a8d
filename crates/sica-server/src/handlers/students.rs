//! Handlers for `/api/students/{key}` endpoints.
//!
//! | Method | Path | Capability |
//! |--------|------|------------|
//! | `GET`  | `/api/students/{key}` | `view_academic`; the digital file |
//! | `PUT`  | `/api/students/{key}/access` | `manage_access`; body `{"status":"blocked"}` |
//! | `GET`  | `/api/students/{key}/history` | `view_history`; scans, newest first |
//! | `GET`  | `/api/students/{key}/incidents` | `view_academic` |
//!
//! `{key}` goes through the same normalisation as a scan.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;
use sica_core::{
  access::AccessEvent,
  discipline::DisciplinaryRecord,
  history::{StudentFile, access_history, incident_history, student_file},
  key::StudentKey,
  role::Capability,
  store::SicaStore,
  student::{self, AccessStatus},
};

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /api/students/{key}`
pub async fn file<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(raw): Path<String>,
) -> Result<Json<StudentFile>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ViewAcademic)?;
  let key = StudentKey::parse(&raw)?;
  Ok(Json(student_file(&*state.store, &key, state.io_timeout()).await?))
}

#[derive(Debug, Deserialize)]
pub struct AccessBody {
  pub status: AccessStatus,
}

/// `PUT /api/students/{key}/access`
pub async fn set_access<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(raw): Path<String>,
  Json(body): Json<AccessBody>,
) -> Result<StatusCode, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ManageAccess)?;
  let key = StudentKey::parse(&raw)?;
  student::set_access(&*state.store, &key, body.status, state.io_timeout()).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/students/{key}/history`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(raw): Path<String>,
) -> Result<Json<Vec<AccessEvent>>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ViewHistory)?;
  let key = StudentKey::parse(&raw)?;
  Ok(Json(access_history(&*state.store, &key, state.io_timeout()).await?))
}

/// `GET /api/students/{key}/incidents`
pub async fn incidents<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Path(raw): Path<String>,
) -> Result<Json<Vec<DisciplinaryRecord>>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ViewAcademic)?;
  let key = StudentKey::parse(&raw)?;
  Ok(Json(incident_history(&*state.store, &key, state.io_timeout()).await?))
}
