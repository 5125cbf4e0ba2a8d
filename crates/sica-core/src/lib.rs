//! Decision core for the SICA campus access kiosk.
//!
//! A scanned student ID goes in, an access verdict and at most one audit
//! event come out. The same crate holds the disciplinary escalation ladder
//! and the role gate that decides which staff actions each role may take.
//!
//! This crate is deliberately free of HTTP and database dependencies. Its
//! collaborators (student directory, access log, notice store, incident
//! store, user directory) are traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod credential;
pub mod dashboard;
pub mod discipline;
pub mod error;
pub mod history;
pub mod key;
pub mod notice;
pub mod pin;
pub mod role;
pub mod session;
pub mod store;
pub mod student;

#[cfg(test)]
mod testing;

pub use error::{BoxError, Error, Result};
