//! Business logic: the registration/login core.

pub mod auth;

pub use auth::{AuthService, Session};
