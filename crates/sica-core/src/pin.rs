//! Staff PIN hashing.
//!
//! PINs are short, so they are only ever stored as argon2 PHC strings.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Hash `pin` with a fresh random salt.
pub fn hash_pin(pin: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(pin.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PinHash(e.to_string()))
}

/// `true` if `pin` matches `phc`. A malformed stored hash never matches.
pub fn verify_pin(pin: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(pin.as_bytes(), &parsed)
    .is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roundtrip() {
    let hash = hash_pin("4821").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_pin("4821", &hash));
    assert!(!verify_pin("4822", &hash));
  }

  #[test]
  fn garbage_hash_never_matches() {
    assert!(!verify_pin("4821", "not-a-phc-string"));
  }
}
