//! Registration and login orchestration over the directory, hasher and token issuer.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::auth::{CredentialHasher, TokenIssuer};
use crate::error::{AuthError, AuthResult};
use crate::models::{Identity, IdentityRef, LoginRequest, PublicProfile, RegistrationRequest, Token};
use crate::repositories::{bounded, Directory};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Token,
    pub profile: PublicProfile,
}

/// Auth core. Stateless per call; clone freely and share across tasks.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn Directory>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn Directory>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        store_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            hasher,
            tokens,
            store_timeout,
        }
    }

    /// Register a new identity and return its public profile.
    ///
    /// # Examples
    /// ```
    /// use gatekeep::auth::{CredentialHasher, HasherConfig, TokenIssuer};
    /// use gatekeep::models::RegistrationRequest;
    /// use gatekeep::repositories::{InMemoryDirectory, InMemoryTokenStore};
    /// use gatekeep::services::AuthService;
    /// use std::{sync::Arc, time::Duration};
    ///
    /// let hasher = CredentialHasher::new(HasherConfig { memory_kib: 1024, iterations: 1, parallelism: 1 }).unwrap();
    /// let tokens = TokenIssuer::new(Arc::new(InMemoryTokenStore::new()), Duration::from_secs(3600), Duration::from_secs(1));
    /// let svc = AuthService::new(Arc::new(InMemoryDirectory::new()), hasher, tokens, Duration::from_secs(1));
    ///
    /// let profile = tokio_test::block_on(svc.register(RegistrationRequest {
    ///     identifier: "Alice".into(),
    ///     secret: "correct horse battery staple".into(),
    ///     display_name: None,
    ///     email: None,
    /// }))
    /// .unwrap();
    /// assert_eq!(profile.identifier, "alice");
    /// ```
    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub async fn register(&self, request: RegistrationRequest) -> AuthResult<PublicProfile> {
        let request = request.validated()?;

        let existing = bounded(
            self.store_timeout,
            "directory_find",
            self.directory.find_by_id(&request.identifier),
        )
        .await?;
        if existing.is_some() {
            debug!("identifier already registered");
            return Err(AuthError::IdentifierTaken);
        }

        let hasher = self.hasher.clone();
        let secret = request.secret.clone();
        let credential = self.off_thread(move || hasher.hash(&secret)).await?;

        let identity = Identity {
            id: Uuid::new_v4(),
            identifier: request.identifier,
            credential,
            display_name: request.display_name,
            email: request.email,
            created_at: Utc::now(),
        };
        let profile = identity.public_profile();

        let inserted = bounded(
            self.store_timeout,
            "directory_insert",
            self.directory.insert_if_absent(identity),
        )
        .await?;
        if !inserted {
            debug!("identifier registered concurrently");
            return Err(AuthError::IdentifierTaken);
        }

        info!(identity_id = %profile.id, "identity_registered");
        Ok(profile)
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown identifiers and wrong secrets fail identically, including the
    /// hashing work spent on them.
    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub async fn login(&self, request: LoginRequest) -> AuthResult<Session> {
        let request = request.validated()?;

        let found = bounded(
            self.store_timeout,
            "directory_find",
            self.directory.find_by_id(&request.identifier),
        )
        .await?;

        let hasher = self.hasher.clone();
        let secret = request.secret;
        let identity = match found {
            Some(identity) => identity,
            None => {
                self.off_thread(move || {
                    hasher.verify_decoy(&secret);
                    Ok(())
                })
                .await?;
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let record = identity.credential.clone();
        let matched = self.off_thread(move || hasher.verify(&secret, &record)).await?;
        if !matched {
            debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&identity).await?;
        info!(identity_id = %identity.id, "login_succeeded");
        Ok(Session {
            token,
            profile: identity.public_profile(),
        })
    }

    /// Resolve a bearer token to the identity it was issued for.
    pub async fn authenticate(&self, token: &str) -> AuthResult<IdentityRef> {
        self.tokens.validate(token).await
    }

    /// Current profile for a bearer token. A token whose identity has since been
    /// removed (or whose identifier now belongs to someone else) is invalid.
    #[instrument(skip_all)]
    pub async fn profile(&self, token: &str) -> AuthResult<(IdentityRef, PublicProfile)> {
        let who = self.tokens.validate(token).await?;
        let identity = bounded(
            self.store_timeout,
            "directory_find",
            self.directory.find_by_id(&who.identifier),
        )
        .await?
        .filter(|identity| identity.id == who.id)
        .ok_or(AuthError::TokenInvalid)?;
        Ok((who, identity.public_profile()))
    }

    /// Revoke a bearer token. Idempotent.
    pub async fn logout(&self, token: &str) -> AuthResult<()> {
        self.tokens.revoke(token).await
    }

    /// Argon2 work runs on the blocking pool so it never stalls the reactor.
    async fn off_thread<T, F>(&self, f: F) -> AuthResult<T>
    where
        F: FnOnce() -> AuthResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|e| {
            error!(error = %e, "hashing task failed");
            AuthError::ServiceUnavailable
        })?
    }
}
