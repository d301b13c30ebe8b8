//! Bearer tokens and their stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token handed to the caller after login. `value` is the only copy of the secret.
#[derive(Clone)]
pub struct Token {
    pub value: String,
    pub identity_id: Uuid,
    pub identifier: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("identifier", &self.identifier)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// What the token store keeps: a digest of the value, never the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub digest: String,
    pub identity_id: Uuid,
    pub identifier: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

impl TokenRecord {
    /// Revocation wins over expiry; both are terminal.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked {
            TokenState::Revoked
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }
}

/// The identity a valid token speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRef {
    pub id: Uuid,
    pub identifier: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in: Duration, revoked: bool) -> (TokenRecord, DateTime<Utc>) {
        let now = Utc::now();
        let rec = TokenRecord {
            digest: "d".to_string(),
            identity_id: Uuid::new_v4(),
            identifier: "alice".to_string(),
            issued_at: now,
            expires_at: now + expires_in,
            revoked,
        };
        (rec, now)
    }

    #[test]
    fn active_until_expiry() {
        let (rec, now) = record(Duration::hours(1), false);
        assert_eq!(rec.state_at(now), TokenState::Active);
        assert_eq!(rec.state_at(now + Duration::hours(1)), TokenState::Expired);
    }

    #[test]
    fn revoked_stays_revoked_after_expiry() {
        let (rec, now) = record(Duration::seconds(1), true);
        assert_eq!(rec.state_at(now), TokenState::Revoked);
        assert_eq!(rec.state_at(now + Duration::days(2)), TokenState::Revoked);
    }
}
