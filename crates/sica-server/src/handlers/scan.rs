//! `POST /api/scan`: the entry gate.

use axum::{Json, extract::State};
use serde::Deserialize;
use sica_core::{access::AccessVerdict, role::Capability, store::SicaStore};

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  /// Exactly what the scanner typed, before any normalisation.
  pub raw: String,
}

/// Denials come back as `200` verdicts. Only an unreachable directory or
/// an unreadable access log produces an error response (`503`).
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Json(body): Json<ScanBody>,
) -> Result<Json<AccessVerdict>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ScanAccess)?;
  let verdict = state
    .processor
    .process_scan(&body.raw, &session.user, state.local_now())
    .await?;
  Ok(Json(verdict))
}
