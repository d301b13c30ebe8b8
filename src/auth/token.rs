//! Opaque bearer tokens: issue, validate, revoke.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::error::{AuthError, AuthResult};
use crate::models::{Identity, IdentityRef, Token, TokenRecord, TokenState};
use crate::repositories::{bounded, TokenStore};

/// Random bytes per token; hex-encoded on the wire.
pub const TOKEN_BYTES: usize = 32;

/// Longest lifetime an issued token may carry.
pub const MAX_TOKEN_TTL: std::time::Duration = std::time::Duration::from_secs(10 * 365 * 24 * 60 * 60);

fn generate_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Store key for a token value.
pub fn token_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
    store_timeout: std::time::Duration,
}

impl TokenIssuer {
    /// `ttl` is clamped to [`MAX_TOKEN_TTL`].
    pub fn new(store: Arc<dyn TokenStore>, ttl: std::time::Duration, store_timeout: std::time::Duration) -> Self {
        let secs = ttl.min(MAX_TOKEN_TTL).as_secs();
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(Duration::zero);
        Self {
            store,
            ttl,
            store_timeout,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn issue(&self, identity: &Identity) -> AuthResult<Token> {
        self.issue_at(identity, Utc::now()).await
    }

    #[instrument(skip(self, identity), fields(identifier = %identity.identifier))]
    pub async fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<Token> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            error!(%now, "token expiry out of range");
            AuthError::CorruptCredentialRecord
        })?;
        let value = generate_value();
        let record = TokenRecord {
            digest: token_digest(&value),
            identity_id: identity.id,
            identifier: identity.identifier.clone(),
            issued_at: now,
            expires_at,
            revoked: false,
        };
        bounded(self.store_timeout, "token_put", self.store.put(record)).await?;
        debug!(%expires_at, "token issued");

        Ok(Token {
            value,
            identity_id: identity.id,
            identifier: identity.identifier.clone(),
            issued_at: now,
            expires_at,
        })
    }

    pub async fn validate(&self, value: &str) -> AuthResult<IdentityRef> {
        self.validate_at(value, Utc::now()).await
    }

    /// Every input takes the same path: digest, one lookup, classify. Malformed
    /// values simply never match a stored digest.
    #[instrument(skip_all)]
    pub async fn validate_at(&self, value: &str, now: DateTime<Utc>) -> AuthResult<IdentityRef> {
        let digest = token_digest(value);
        let record = bounded(self.store_timeout, "token_get", self.store.get(&digest)).await?;

        match record.map(|r| (r.state_at(now), r)) {
            Some((TokenState::Active, r)) => Ok(IdentityRef {
                id: r.identity_id,
                identifier: r.identifier,
                expires_at: r.expires_at,
            }),
            Some((TokenState::Expired, _)) => Err(AuthError::TokenExpired),
            Some((TokenState::Revoked, _)) | None => Err(AuthError::TokenInvalid),
        }
    }

    /// Idempotent. Revoking an unknown or already revoked token succeeds.
    #[instrument(skip_all)]
    pub async fn revoke(&self, value: &str) -> AuthResult<()> {
        let digest = token_digest(value);
        bounded(self.store_timeout, "token_revoke", self.store.mark_revoked(&digest)).await?;
        debug!("token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HashRecord;
    use crate::repositories::InMemoryTokenStore;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            Arc::new(InMemoryTokenStore::new()),
            std::time::Duration::from_secs(24 * 60 * 60),
            std::time::Duration::from_secs(1),
        )
    }

    fn alice() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            identifier: "alice".to_string(),
            credential: HashRecord::from_stored("unused"),
            display_name: None,
            email: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_token_validates_to_its_identity() {
        let issuer = issuer();
        let who = alice();
        let token = issuer.issue(&who).await.unwrap();
        assert_eq!(token.value.len(), TOKEN_BYTES * 2);

        let got = issuer.validate(&token.value).await.unwrap();
        assert_eq!(got.id, who.id);
        assert_eq!(got.identifier, "alice");
        assert_eq!(got.expires_at, token.expires_at);
    }

    #[tokio::test]
    async fn token_expires_after_ttl() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at(&alice(), now).await.unwrap();

        let before = now + issuer.ttl() - Duration::seconds(1);
        assert!(issuer.validate_at(&token.value, before).await.is_ok());

        let after = now + issuer.ttl() + Duration::seconds(1);
        assert_eq!(
            issuer.validate_at(&token.value, after).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn revoked_token_is_invalid_and_revoke_is_idempotent() {
        let issuer = issuer();
        let token = issuer.issue(&alice()).await.unwrap();

        issuer.revoke(&token.value).await.unwrap();
        issuer.revoke(&token.value).await.unwrap();
        assert_eq!(
            issuer.validate(&token.value).await.unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_are_invalid() {
        let issuer = issuer();
        let unissued = "f".repeat(TOKEN_BYTES * 2);
        for value in ["", "not-hex", unissued.as_str()] {
            assert_eq!(
                issuer.validate(value).await.unwrap_err(),
                AuthError::TokenInvalid
            );
        }
        issuer.revoke("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn tokens_are_not_repeated() {
        let issuer = issuer();
        let who = alice();
        let mut seen = HashSet::new();
        for _ in 0..32 {
            let token = issuer.issue(&who).await.unwrap();
            assert!(seen.insert(token.value));
        }
    }

    #[tokio::test]
    async fn oversized_ttl_is_clamped() {
        let issuer = TokenIssuer::new(
            Arc::new(InMemoryTokenStore::new()),
            std::time::Duration::from_secs(u64::MAX),
            std::time::Duration::from_secs(1),
        );
        assert_eq!(issuer.ttl(), Duration::seconds(MAX_TOKEN_TTL.as_secs() as i64));

        let token = issuer.issue(&alice()).await.unwrap();
        assert!(token.expires_at > token.issued_at);
        assert!(issuer.validate(&token.value).await.is_ok());
    }

    #[tokio::test]
    async fn expiry_past_the_calendar_is_an_error_not_a_panic() {
        let issuer = issuer();
        let end = DateTime::<Utc>::MAX_UTC;
        assert_eq!(
            issuer.issue_at(&alice(), end).await.unwrap_err(),
            AuthError::CorruptCredentialRecord
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn validate_racing_revoke_never_sees_a_live_token_afterwards() {
        let issuer = issuer();
        let token = issuer.issue(&alice()).await.unwrap();
        let revoked = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        for _ in 0..16 {
            let issuer = issuer.clone();
            let value = token.value.clone();
            let revoked = revoked.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let started_after_revoke = revoked.load(Ordering::SeqCst);
                    match issuer.validate(&value).await {
                        Ok(_) => assert!(!started_after_revoke, "live token after revoke"),
                        Err(e) => assert_eq!(e, AuthError::TokenInvalid),
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        tokio::task::yield_now().await;
        issuer.revoke(&token.value).await.unwrap();
        revoked.store(true, Ordering::SeqCst);

        for reader in futures::future::join_all(readers).await {
            reader.unwrap();
        }
        assert_eq!(
            issuer.validate(&token.value).await.unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_issue_keeps_identities_apart() {
        let issuer = issuer();
        let tasks = (0..16).map(|i| {
            let issuer = issuer.clone();
            tokio::spawn(async move {
                let mut who = alice();
                who.identifier = format!("user{}", i);
                let token = issuer.issue(&who).await.unwrap();
                (who, token)
            })
        });

        let issued: Vec<(Identity, Token)> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for (who, token) in &issued {
            let got = issuer.validate(&token.value).await.unwrap();
            assert_eq!(got.id, who.id);
            assert_eq!(got.identifier, who.identifier);
        }
        let distinct: HashSet<&str> = issued.iter().map(|(_, t)| t.value.as_str()).collect();
        assert_eq!(distinct.len(), issued.len());
    }

    #[test]
    fn digest_is_stable_and_hides_the_value() {
        let d = token_digest("abc");
        assert_eq!(d, token_digest("abc"));
        assert_eq!(d.len(), 64);
        assert!(!d.contains("abc"));
    }
}
