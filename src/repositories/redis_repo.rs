//! Redis-backed token store.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{StoreError, TokenStore};
use crate::models::TokenRecord;

const TOKEN_PREFIX: &str = "gatekeep:token:";
const REVOKED_PREFIX: &str = "gatekeep:revoked:";

/// Expired records stay readable this long so late validation reports expiry
/// instead of "unknown".
const EXPIRED_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Sets the revocation marker only while the token record exists.
const REVOKE_IF_PRESENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('SET', KEYS[2], '1', 'EX', ARGV[1])
    return 1
end
return 0
"#;

fn token_key(digest: &str) -> String {
    format!("{}{}", TOKEN_PREFIX, digest)
}

fn revoked_key(digest: &str) -> String {
    format!("{}{}", REVOKED_PREFIX, digest)
}

/// Token records as JSON strings; revocation as a sibling marker key so it never
/// races a read-modify-write of the record.
#[derive(Clone)]
pub struct RedisTokenStore {
    client: Arc<redis::Client>,
    marker_ttl_secs: u64,
}

impl RedisTokenStore {
    /// `token_ttl` bounds how long a revocation marker must outlive its token.
    pub fn new(redis_url: &str, token_ttl: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
            marker_ttl_secs: token_ttl.as_secs().saturating_add(EXPIRED_RETENTION_SECS),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(&self, record: TokenRecord) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let remaining = (record.expires_at - Utc::now()).num_seconds().max(1) as u64;
        let payload = serde_json::to_string(&record)?;
        redis::cmd("SET")
            .arg(token_key(&record.digest))
            .arg(payload)
            .arg("EX")
            .arg(remaining.saturating_add(EXPIRED_RETENTION_SECS))
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(identifier = %record.identifier, "token stored");
        Ok(())
    }

    async fn get(&self, digest: &str) -> Result<Option<TokenRecord>, StoreError> {
        let mut conn = self.connection().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(token_key(digest))
            .arg(revoked_key(digest))
            .query_async(&mut conn)
            .await?;

        let mut values = values.into_iter();
        let record = match values.next().flatten() {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let mut record: TokenRecord = serde_json::from_str(&record)?;
        if values.next().flatten().is_some() {
            record.revoked = true;
        }
        Ok(Some(record))
    }

    async fn mark_revoked(&self, digest: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let marked: i64 = redis::Script::new(REVOKE_IF_PRESENT)
            .key(token_key(digest))
            .key(revoked_key(digest))
            .arg(self.marker_ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        if marked == 0 {
            debug!("revocation skipped: no such token");
        }
        Ok(())
    }
}
