//! Request extractors shared by the auth handlers.

pub mod auth;
pub mod payload;

pub use auth::BearerToken;
pub use payload::Payload;
