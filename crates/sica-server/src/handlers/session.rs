//! Handlers for login, logout and the terminal's navigation selection.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/login` | Body: [`LoginBody`]; returns [`SessionView`] with the bearer token |
//! | `POST` | `/api/logout` | Ends the session; 204 |
//! | `GET`  | `/api/session` | Current user, role, capabilities and selection |
//! | `PUT`  | `/api/session/selection` | Body: `{"capability":"..."}` |

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sica_core::{
  role::Capability,
  session::{Session, User},
  store::SicaStore,
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub pin:      String,
}

/// What a terminal needs to render its menu.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
  /// Send back as `Authorization: Bearer <token>`.
  pub token:        Uuid,
  pub user:         User,
  pub capabilities: Vec<Capability>,
  pub selection:    Capability,
  pub started_at:   DateTime<Utc>,
}

impl From<&Session> for SessionView {
  fn from(s: &Session) -> Self {
    Self {
      token:        s.session_id,
      user:         s.user.clone(),
      capabilities: s.capabilities().into_iter().collect(),
      selection:    s.selection,
      started_at:   s.started_at,
    }
  }
}

/// `POST /api/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<SessionView>, ApiError>
where
  S: SicaStore + 'static,
{
  let session =
    Session::login(&*state.store, &body.username, &body.pin, Utc::now(), state.io_timeout())
      .await
      .inspect_err(|e| tracing::warn!(user = %body.username.trim(), error = %e, "login refused"))?;
  let view = SessionView::from(&session);
  state.sessions.insert(session).await;
  Ok(Json(view))
}

/// `POST /api/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
) -> StatusCode
where
  S: SicaStore + 'static,
{
  state.sessions.remove(session.session_id).await;
  tracing::info!(user = %session.user.username, "session closed");
  StatusCode::NO_CONTENT
}

/// `GET /api/session`
pub async fn current(Authenticated(session): Authenticated) -> Json<SessionView> {
  Json(SessionView::from(&session))
}

#[derive(Debug, Deserialize)]
pub struct SelectionBody {
  pub capability: Capability,
}

/// `PUT /api/session/selection`
pub async fn select<S>(
  State(state): State<AppState<S>>,
  Authenticated(session): Authenticated,
  Json(body): Json<SelectionBody>,
) -> Result<Json<SessionView>, ApiError>
where
  S: SicaStore + 'static,
{
  let session = state.sessions.select(session.session_id, body.capability).await?;
  Ok(Json(SessionView::from(&session)))
}
