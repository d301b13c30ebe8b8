//! Credential hashing: salted Argon2id records in PHC string form.

use argon2::{
    password_hash::{
        self,
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::fmt;
use tracing::error;

use crate::error::{AuthError, AuthResult};

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Stored credential: `$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`.
/// Algorithm, parameters and salt travel with the hash.
#[derive(Clone, PartialEq, Eq)]
pub struct HashRecord(String);

impl HashRecord {
    /// Wrap a record loaded from storage. Not checked until it is verified against.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Algorithm tag, e.g. `argon2id`, if the record is well formed.
    pub fn algorithm(&self) -> Option<String> {
        PasswordHash::new(&self.0)
            .ok()
            .map(|h| h.algorithm.as_str().to_string())
    }
}

impl fmt::Debug for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashRecord(<redacted>)")
    }
}

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    decoy: HashRecord,
}

impl CredentialHasher {
    pub fn new(config: HasherConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "invalid argon2 parameters");
                AuthError::CorruptCredentialRecord
            })?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut filler = [0u8; 16];
        OsRng.fill_bytes(&mut filler);
        let decoy = hash_with(&argon2, hex::encode(filler).as_bytes())?;

        Ok(Self { argon2, decoy })
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> AuthResult<HashRecord> {
        hash_with(&self.argon2, secret.as_bytes())
    }

    /// Check a secret against a record using the record's own salt and parameters.
    /// A mismatch is `Ok(false)`; only an unreadable record is an error.
    pub fn verify(&self, secret: &str, record: &HashRecord) -> AuthResult<bool> {
        let parsed = PasswordHash::new(record.as_str()).map_err(|e| {
            error!(error = %e, "unparseable credential record");
            AuthError::CorruptCredentialRecord
        })?;
        if parsed.salt.is_none() || parsed.hash.is_none() {
            error!("credential record lacks salt or hash output");
            return Err(AuthError::CorruptCredentialRecord);
        }
        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "credential record could not be verified");
                Err(AuthError::CorruptCredentialRecord)
            }
        }
    }

    /// Burn the same work as a real verification. Used when there is no record to
    /// check against, so unknown identifiers cost as much as wrong secrets.
    pub fn verify_decoy(&self, secret: &str) {
        let _ = self.verify(secret, &self.decoy);
    }
}

fn hash_with(argon2: &Argon2<'static>, secret: &[u8]) -> AuthResult<HashRecord> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(secret, &salt)
        .map_err(|e| {
            error!(error = %e, "credential hashing failed");
            AuthError::CorruptCredentialRecord
        })?
        .to_string();
    Ok(HashRecord(hash))
}
