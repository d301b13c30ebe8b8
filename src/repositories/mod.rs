//! Storage seams consumed by the auth core, with in-memory and Redis backends.
//! The Postgres directory lives in `crate::db`.

mod memory;
mod redis_repo;

pub use memory::{InMemoryDirectory, InMemoryTokenStore};
pub use redis_repo::RedisTokenStore;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::error::AuthError;
use crate::models::{Identity, TokenRecord};

/// Failures raised by storage backends. Never leaves the auth service.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable identities keyed by normalized identifier.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_by_id(&self, identifier: &str) -> Result<Option<Identity>, StoreError>;

    /// Atomic compare-and-insert. `false` means the identifier already existed and
    /// nothing was written.
    async fn insert_if_absent(&self, identity: Identity) -> Result<bool, StoreError>;
}

/// Token records keyed by the digest of the token value.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put(&self, record: TokenRecord) -> Result<(), StoreError>;
    async fn get(&self, digest: &str) -> Result<Option<TokenRecord>, StoreError>;
    /// Idempotent; unknown digests are ignored.
    async fn mark_revoked(&self, digest: &str) -> Result<(), StoreError>;
}

/// Run a store call under a deadline. Timeouts and backend errors both become
/// `ServiceUnavailable`.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(op, error = %e, "store call failed");
            Err(AuthError::ServiceUnavailable)
        }
        Err(_) => {
            warn!(op, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(AuthError::ServiceUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_values_through() {
        let got = bounded(Duration::from_secs(1), "noop", async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(got, Ok(7));
    }

    #[tokio::test]
    async fn bounded_maps_errors_to_unavailable() {
        let got: Result<(), _> = bounded(Duration::from_secs(1), "fail", async {
            Err(StoreError::Unavailable("down".to_string()))
        })
        .await;
        assert_eq!(got, Err(AuthError::ServiceUnavailable));
    }

    #[tokio::test]
    async fn bounded_maps_timeouts_to_unavailable() {
        let got: Result<(), _> = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(got, Err(AuthError::ServiceUnavailable));
    }
}
