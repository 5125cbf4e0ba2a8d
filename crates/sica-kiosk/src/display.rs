//! Text rendering of gate outcomes.
//!
//! Each outcome maps to one [`Screen`]: a tone the terminal colours by and
//! the lines to show. A system fault never borrows the denial tone.

use std::fmt;

use sica_core::{
  access::{AccessVerdict, DenialReason},
  notice::{Notice, NoticePriority},
};

use crate::client::ScanReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Granted,
  Denied,
  Fault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
  pub tone:  Tone,
  pub lines: Vec<String>,
}

impl Screen {
  fn new(tone: Tone, headline: impl Into<String>) -> Self {
    Self { tone, lines: vec![headline.into()] }
  }

  fn with(mut self, line: impl Into<String>) -> Self {
    self.lines.push(line.into());
    self
  }
}

impl fmt::Display for Screen {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (open, close) = match self.tone {
      Tone::Granted => ("\x1b[1;32m", "\x1b[0m"),
      Tone::Denied => ("\x1b[1;31m", "\x1b[0m"),
      Tone::Fault => ("\x1b[1;33m", "\x1b[0m"),
    };
    for (i, line) in self.lines.iter().enumerate() {
      if i == 0 {
        writeln!(f, "{open}{line}{close}")?;
      } else {
        writeln!(f, "  {line}")?;
      }
    }
    Ok(())
  }
}

fn notice_line(notice: &Notice) -> String {
  let tag = match notice.priority {
    NoticePriority::Low => "note",
    NoticePriority::Medium => "NOTICE",
    NoticePriority::High => "URGENT",
  };
  format!("[{tag}] {}", notice.message)
}

/// `None` for an empty scan: nothing is shown.
pub fn render(reply: &ScanReply) -> Option<Screen> {
  Some(match reply {
    ScanReply::Verdict(AccessVerdict::NoOp) => return None,
    ScanReply::Verdict(AccessVerdict::Granted { student_name, group, notice }) => {
      let screen = Screen::new(Tone::Granted, "ACCESS GRANTED").with(format!("{student_name} ({group})"));
      match notice {
        Some(n) => screen.with(notice_line(n)),
        None => screen,
      }
    }
    ScanReply::Verdict(AccessVerdict::Denied { reason, student_name }) => {
      let headline = match reason {
        DenialReason::Unknown => "NOT REGISTERED",
        DenialReason::Blocked => "ACCESS DENIED",
        DenialReason::AlreadyRegisteredToday => "ALREADY REGISTERED TODAY",
      };
      let screen = Screen::new(Tone::Denied, headline);
      let screen = match student_name {
        Some(name) => screen.with(name.clone()),
        None => screen,
      };
      match reason {
        DenialReason::Blocked => screen.with("Please see the office"),
        _ => screen,
      }
    }
    ScanReply::Unavailable(detail) => Screen::new(Tone::Fault, "SYSTEM UNAVAILABLE")
      .with("Scan again or call staff")
      .with(detail.clone()),
    ScanReply::SessionLost => Screen::new(Tone::Fault, "SESSION ENDED"),
    ScanReply::Rejected(detail) => Screen::new(Tone::Fault, "SCAN NOT PROCESSED")
      .with("Scan again or call staff")
      .with(detail.clone()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use sica_core::key::StudentKey;
  use uuid::Uuid;

  #[test]
  fn empty_scan_renders_nothing() {
    assert!(render(&ScanReply::Verdict(AccessVerdict::NoOp)).is_none());
  }

  #[test]
  fn grant_shows_name_group_and_notice() {
    let notice = Notice {
      notice_id:   Uuid::new_v4(),
      student_key: StudentKey::parse("A-1").unwrap(),
      message:     "Bring your ID".into(),
      priority:    NoticePriority::High,
      active:      true,
      created_at:  chrono::Utc::now(),
      created_by:  "prefect".into(),
    };
    let screen = render(&ScanReply::Verdict(AccessVerdict::Granted {
      student_name: "Ana".into(),
      group:        "4AMEC".into(),
      notice:       Some(notice),
    }))
    .unwrap();

    assert_eq!(screen.tone, Tone::Granted);
    assert_eq!(screen.lines, ["ACCESS GRANTED", "Ana (4AMEC)", "[URGENT] Bring your ID"]);
  }

  #[test]
  fn denials_and_faults_look_different() {
    let denied = render(&ScanReply::Verdict(AccessVerdict::Denied {
      reason:       DenialReason::Blocked,
      student_name: Some("Xavi".into()),
    }))
    .unwrap();
    assert_eq!(denied.tone, Tone::Denied);
    assert_eq!(denied.lines[0], "ACCESS DENIED");

    let fault = render(&ScanReply::Unavailable("directory unavailable".into())).unwrap();
    assert_eq!(fault.tone, Tone::Fault);
    assert_eq!(fault.lines[0], "SYSTEM UNAVAILABLE");

    let rejected = render(&ScanReply::Rejected("bad request: raw".into())).unwrap();
    assert_eq!(rejected.tone, Tone::Fault);
    assert_eq!(rejected.lines, ["SCAN NOT PROCESSED", "Scan again or call staff", "bad request: raw"]);
  }

  #[test]
  fn repeat_entry_is_a_denial() {
    let screen = render(&ScanReply::Verdict(AccessVerdict::Denied {
      reason:       DenialReason::AlreadyRegisteredToday,
      student_name: Some("Ana".into()),
    }))
    .unwrap();
    assert_eq!(screen.tone, Tone::Denied);
    assert_eq!(screen.lines, ["ALREADY REGISTERED TODAY", "Ana"]);
  }
}
