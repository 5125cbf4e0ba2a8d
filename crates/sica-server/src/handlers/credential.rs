//! `GET /api/credential/{raw}`: unauthenticated self-service lookup of the
//! payload a student's digital ID encodes.
//!
//! `raw` is one path segment; a `/` typed into it must be sent as `%2F`.

use axum::{
  Json,
  extract::{Path, State},
};
use sica_core::{
  credential::{CredentialStatus, check_credential},
  store::SicaStore,
};

use crate::{AppState, error::ApiError};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(raw): Path<String>,
) -> Result<Json<CredentialStatus>, ApiError>
where
  S: SicaStore + 'static,
{
  let status = check_credential(&*state.store, &raw, state.io_timeout()).await?;
  Ok(Json(status))
}
