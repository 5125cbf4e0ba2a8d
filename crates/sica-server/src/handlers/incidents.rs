//! Handlers for `/api/incidents`.
//!
//! `POST` records an incident and returns it with its escalation tier.
//! `GET` lists every incident on file for services follow-up.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use sica_core::{
  discipline::{DisciplinaryRecord, NewIncident, record_incident},
  history::incident_log,
  role::Capability,
  store::SicaStore,
};

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `POST /api/incidents`: returns 201 + the stored record.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Json(body): Json<NewIncident>,
) -> Result<(StatusCode, Json<DisciplinaryRecord>), ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::RecordIncident)?;
  let record =
    record_incident(&*state.store, &session.user, body, Utc::now(), state.io_timeout()).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/incidents`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
) -> Result<Json<Vec<DisciplinaryRecord>>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ManagePractica)?;
  Ok(Json(incident_log(&*state.store, state.io_timeout()).await?))
}
