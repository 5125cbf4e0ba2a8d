//! Identifier normalisation.
//!
//! Barcode and QR scanners that emulate a keyboard frequently emit the wrong
//! glyph for the separator printed on a student ID, depending on the host
//! keyboard layout. Every lookup and comparison goes through [`normalize`]
//! first so that `A123'45`, `a123/45` and `A123-45` all name one student.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The canonical separator every substituted glyph collapses to.
pub const SEPARATOR: char = '-';

/// Characters scanners emit in place of [`SEPARATOR`].
const SUBSTITUTES: &[char] = &[
  '\'', '"', '/', '\\', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
];

/// The canonical, non-empty form of a scanned student credential.
///
/// Only constructed through [`normalize`], so holding one means the value is
/// already trimmed, upper-cased and separator-canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentKey(String);

impl StudentKey {
  /// Normalise `raw` and reject empty input.
  pub fn parse(raw: &str) -> Result<Self> {
    normalize(raw).into_key().ok_or(Error::EmptyKey)
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for StudentKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for StudentKey {
  fn as_ref(&self) -> &str { &self.0 }
}

impl TryFrom<String> for StudentKey {
  type Error = Error;

  fn try_from(raw: String) -> Result<Self> { Self::parse(&raw) }
}

impl From<StudentKey> for String {
  fn from(key: StudentKey) -> Self { key.0 }
}

/// Result of normalising raw scanner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedKey {
  /// Input was empty or whitespace only. Callers short-circuit on this:
  /// no lookup, no event, no verdict.
  Empty,
  Key(StudentKey),
}

impl NormalizedKey {
  pub fn into_key(self) -> Option<StudentKey> {
    match self {
      Self::Empty => None,
      Self::Key(k) => Some(k),
    }
  }

  pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }
}

/// Canonicalise raw scanner input into a comparable student key.
///
/// Trims surrounding whitespace, upper-cases, and replaces every separator
/// substitute with [`SEPARATOR`]. Idempotent.
pub fn normalize(raw: &str) -> NormalizedKey {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return NormalizedKey::Empty;
  }

  let canonical: String = trimmed
    .to_uppercase()
    .chars()
    .map(|c| if SUBSTITUTES.contains(&c) { SEPARATOR } else { c })
    .collect();

  NormalizedKey::Key(StudentKey(canonical))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(raw: &str) -> String {
    normalize(raw).into_key().expect("non-empty").to_string()
  }

  #[test]
  fn scanner_substitutes_collapse_to_hyphen() {
    for raw in ["A123'45", "A123\"45", "A123/45", "A123\\45", "A123\u{2019}45"] {
      assert_eq!(key(raw), "A123-45", "input {raw:?}");
    }
  }

  #[test]
  fn trims_and_uppercases() {
    assert_eq!(key("  22173abc-1 \n"), "22173ABC-1");
  }

  #[test]
  fn empty_and_whitespace_are_sentinel() {
    assert_eq!(normalize(""), NormalizedKey::Empty);
    assert_eq!(normalize(" \t\r\n"), NormalizedKey::Empty);
  }

  #[test]
  fn idempotent() {
    for raw in ["a123'45", " x/1 ", "Straße\\9", "22173-1", "“q”"] {
      let once = key(raw);
      assert_eq!(key(&once), once, "input {raw:?}");
    }
  }

  #[test]
  fn interior_whitespace_is_kept() {
    assert_eq!(key("a b"), "A B");
  }

  #[test]
  fn parse_rejects_empty() {
    assert!(matches!(StudentKey::parse("   "), Err(Error::EmptyKey)));
  }

  #[test]
  fn deserialising_normalises() {
    let k: StudentKey = serde_json::from_str("\"x'1\"").unwrap();
    assert_eq!(k.as_str(), "X-1");
    assert!(serde_json::from_str::<StudentKey>("\"  \"").is_err());
  }
}
