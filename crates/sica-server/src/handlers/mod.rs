//! Axum handlers, one module per resource.

pub mod credential;
pub mod dashboard;
pub mod incidents;
pub mod notices;
pub mod scan;
pub mod session;
pub mod students;
pub mod users;
