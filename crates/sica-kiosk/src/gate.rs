//! One scanner line in, at most one screen out.
//!
//! Nothing a single scan runs into ends the gate loop. A refused re-login
//! or an odd server reply becomes a fault screen, and the next line is
//! read as usual.

use anyhow::Result;
use sica_core::key::normalize;

use crate::{
  client::{ApiClient, ScanReply},
  display::{self, Screen},
};

/// The server side of the gate, as the loop sees it.
pub trait Gate {
  async fn submit(&self, raw: &str) -> ScanReply;

  /// Open a fresh session after the server dropped the old one.
  async fn reconnect(&mut self) -> Result<()>;
}

impl Gate for ApiClient {
  async fn submit(&self, raw: &str) -> ScanReply { self.scan(raw).await }

  async fn reconnect(&mut self) -> Result<()> { self.login().await.map(|_| ()) }
}

/// Handle one line of scanner input.
///
/// Blank input never reaches the server. A lost session is re-opened once
/// and the scan resubmitted.
pub async fn process_line<G: Gate>(gate: &mut G, line: &str) -> Option<Screen> {
  if normalize(line).is_empty() {
    return None;
  }

  let mut reply = gate.submit(line).await;
  if let ScanReply::SessionLost = reply {
    tracing::info!("session ended by server; logging in again");
    reply = match gate.reconnect().await {
      Ok(()) => gate.submit(line).await,
      Err(e) => {
        tracing::warn!(error = %format!("{e:#}"), "re-login failed");
        ScanReply::Unavailable(format!("login failed: {e:#}"))
      }
    };
  }

  display::render(&reply)
}

#[cfg(test)]
mod tests {
  use std::{cell::Cell, collections::VecDeque, sync::Mutex};

  use anyhow::anyhow;
  use sica_core::access::{AccessVerdict, DenialReason};

  use super::*;
  use crate::display::Tone;

  /// Replays canned replies and counts what the loop asked for.
  struct StubGate {
    replies:   Mutex<VecDeque<ScanReply>>,
    login_ok:  bool,
    submitted: Cell<usize>,
    logins:    usize,
  }

  impl StubGate {
    fn new(replies: impl IntoIterator<Item = ScanReply>, login_ok: bool) -> Self {
      Self {
        replies: Mutex::new(replies.into_iter().collect()),
        login_ok,
        submitted: Cell::new(0),
        logins: 0,
      }
    }
  }

  impl Gate for StubGate {
    async fn submit(&self, _raw: &str) -> ScanReply {
      self.submitted.set(self.submitted.get() + 1);
      self
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .expect("stub ran out of replies")
    }

    async fn reconnect(&mut self) -> Result<()> {
      self.logins += 1;
      if self.login_ok { Ok(()) } else { Err(anyhow!("login refused: invalid credentials")) }
    }
  }

  fn denied() -> ScanReply {
    ScanReply::Verdict(AccessVerdict::Denied {
      reason:       DenialReason::Unknown,
      student_name: None,
    })
  }

  #[tokio::test]
  async fn blank_line_never_reaches_the_server() {
    let mut gate = StubGate::new([], true);

    assert!(process_line(&mut gate, "").await.is_none());
    assert!(process_line(&mut gate, "   \t").await.is_none());
    assert_eq!(gate.submitted.get(), 0);
  }

  #[tokio::test]
  async fn failed_relogin_shows_a_fault_and_keeps_going() {
    let mut gate = StubGate::new([ScanReply::SessionLost], false);

    let screen = process_line(&mut gate, "A-1").await.unwrap();
    assert_eq!(screen.tone, Tone::Fault);
    assert_eq!(screen.lines[0], "SYSTEM UNAVAILABLE");
    assert!(screen.lines.iter().any(|l| l.contains("invalid credentials")));
    assert_eq!(gate.logins, 1);
    assert_eq!(gate.submitted.get(), 1);

    // The next scan is handled normally.
    gate.replies.lock().unwrap().push_back(denied());
    let screen = process_line(&mut gate, "A-2").await.unwrap();
    assert_eq!(screen.tone, Tone::Denied);
  }

  #[tokio::test]
  async fn lost_session_is_reopened_and_the_scan_resubmitted() {
    let mut gate = StubGate::new([ScanReply::SessionLost, denied()], true);

    let screen = process_line(&mut gate, "A-1").await.unwrap();
    assert_eq!(screen.tone, Tone::Denied);
    assert_eq!(screen.lines[0], "NOT REGISTERED");
    assert_eq!(gate.logins, 1);
    assert_eq!(gate.submitted.get(), 2);
  }

  #[tokio::test]
  async fn rejected_scan_is_a_fault_not_an_exit() {
    let mut gate = StubGate::new([ScanReply::Rejected("bad request: raw".into()), denied()], true);

    let screen = process_line(&mut gate, "A-1").await.unwrap();
    assert_eq!(screen.tone, Tone::Fault);
    assert_eq!(screen.lines[0], "SCAN NOT PROCESSED");

    let screen = process_line(&mut gate, "A-1").await.unwrap();
    assert_eq!(screen.tone, Tone::Denied);
    assert_eq!(gate.logins, 0);
  }
}
