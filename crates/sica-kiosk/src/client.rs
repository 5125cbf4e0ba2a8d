//! Async HTTP client for the gate endpoints of the SICA API.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sica_core::{access::AccessVerdict, role::Capability, session::User};
use std::time::Duration;
use uuid::Uuid;

/// Connection settings for the SICA API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub pin:      String,
}

/// The parts of the server's session reply the kiosk uses.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
  pub token:        Uuid,
  pub user:         User,
  pub capabilities: Vec<Capability>,
}

/// What came back for one scan.
#[derive(Debug)]
pub enum ScanReply {
  /// The server decided. Denials are verdicts too.
  Verdict(AccessVerdict),
  /// The server could not decide (`503`).
  Unavailable(String),
  /// The session is gone; log in again.
  SessionLost,
  /// The server answered but the scan was not processed: an unexpected
  /// status or an unreadable body.
  Rejected(String),
}

/// Error body shape shared by every non-2xx API response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
  token:  Option<Uuid>,
}

impl ApiClient {
  /// `timeout` bounds every request; a gate must never hang on one scan.
  pub fn new(config: ApiConfig, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config, token: None })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<ErrorBody>().await {
      Ok(body) => body.error,
      Err(_) => status.to_string(),
    }
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// `POST /api/login`
  pub async fn login(&mut self) -> Result<SessionInfo> {
    let resp = self
      .client
      .post(self.url("/login"))
      .json(&serde_json::json!({
        "username": self.config.username,
        "pin":      self.config.pin,
      }))
      .send()
      .await
      .context("POST /login failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("login refused: {}", Self::error_message(resp).await));
    }
    let session: SessionInfo = resp.json().await.context("deserialising session")?;
    self.token = Some(session.token);
    Ok(session)
  }

  /// `POST /api/logout`. A no-op without a session.
  pub async fn logout(&mut self) -> Result<()> {
    if self.token.is_none() {
      return Ok(());
    }
    let resp = self
      .auth(self.client.post(self.url("/logout")))
      .send()
      .await
      .context("POST /logout failed")?;
    self.token = None;
    if !resp.status().is_success() && resp.status() != StatusCode::UNAUTHORIZED {
      return Err(anyhow!("POST /logout → {}", resp.status()));
    }
    Ok(())
  }

  // ── Gate ──────────────────────────────────────────────────────────────────

  /// `POST /api/scan` with the scanner's raw input.
  ///
  /// Never fails: every outcome is something the gate can show. Transport
  /// failures are reported as [`ScanReply::Unavailable`], since to the
  /// person at the gate an unreachable server and a failing one look alike.
  pub async fn scan(&self, raw: &str) -> ScanReply {
    let sent = self
      .auth(self.client.post(self.url("/scan")))
      .json(&serde_json::json!({ "raw": raw }))
      .send()
      .await;

    let resp = match sent {
      Ok(resp) => resp,
      Err(e) => {
        tracing::warn!(error = %e, "scan request failed");
        return ScanReply::Unavailable(e.to_string());
      }
    };

    match resp.status() {
      s if s.is_success() => match resp.json().await {
        Ok(verdict) => ScanReply::Verdict(verdict),
        Err(e) => {
          tracing::warn!(error = %e, "unreadable verdict");
          ScanReply::Rejected(format!("unreadable verdict: {e}"))
        }
      },
      StatusCode::UNAUTHORIZED => ScanReply::SessionLost,
      s if s.is_server_error() => ScanReply::Unavailable(Self::error_message(resp).await),
      s => {
        let message = Self::error_message(resp).await;
        tracing::warn!(status = %s, %message, "scan rejected");
        ScanReply::Rejected(message)
      }
    }
  }
}
