//! `GET /api/dashboard`

use axum::{Json, extract::State};
use sica_core::{
  dashboard::{DashboardSummary, load_dashboard},
  role::Capability,
  store::SicaStore,
};

use crate::{AppState, auth::Authenticated, error::ApiError};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
) -> Result<Json<DashboardSummary>, ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ViewDashboard)?;
  Ok(Json(load_dashboard(&*state.store, state.io_timeout()).await?))
}
