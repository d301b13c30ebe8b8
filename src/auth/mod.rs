//! Authentication: credential hashing, bearer tokens, and the HTTP handlers.

mod handlers;
mod hasher;
mod token;

pub use handlers::{login, logout, me, register};
pub use hasher::{CredentialHasher, HashRecord, HasherConfig};
pub use token::{token_digest, TokenIssuer, MAX_TOKEN_TTL, TOKEN_BYTES};
