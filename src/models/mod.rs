//! Data models for identities, requests, and tokens.

pub mod identity;
pub mod token;

pub use identity::*;
pub use token::*;
