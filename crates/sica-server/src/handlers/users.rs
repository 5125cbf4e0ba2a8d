//! `POST /api/users`: create or replace a staff account.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use sica_core::{
  role::{Capability, Role},
  session::{User, provision_user},
  store::SicaStore,
};

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct NewUserBody {
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
  pub pin:          String,
}

pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Json(body): Json<NewUserBody>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
  S: SicaStore + 'static,
{
  session.require(Capability::ManageUsers)?;
  let user = User {
    username:     body.username,
    display_name: body.display_name,
    role:         body.role,
  };
  let user = provision_user(&*state.store, user, &body.pin, state.io_timeout()).await?;
  Ok((StatusCode::CREATED, Json(user)))
}
