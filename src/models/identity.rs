//! Identities, their public profile, and the registration/login inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::HashRecord;
use crate::error::{AuthError, AuthResult, FieldViolation};

/// Secrets need at least this many distinct characters.
pub const SECRET_MIN_DISTINCT_CHARS: usize = 4;

/// Case-normalized form of an identifier: surrounding whitespace removed, lowercased.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A registered user's durable record.
#[derive(Clone)]
pub struct Identity {
    pub id: Uuid,
    pub identifier: String,
    pub credential: HashRecord,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            identifier: self.identifier.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("credential", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// What callers may see of an identity. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub identifier: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[serde(alias = "username")]
    #[validate(length(min = 3, max = 64))]
    pub identifier: String,
    #[serde(alias = "password")]
    #[validate(length(min = 8, max = 128))]
    pub secret: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
}

impl RegistrationRequest {
    /// Normalize, then check every field. Reports all violations at once.
    pub fn validated(mut self) -> AuthResult<Self> {
        self.identifier = normalize_identifier(&self.identifier);
        self.display_name = non_blank(self.display_name);
        self.email = non_blank(self.email).map(|e| e.to_lowercase());

        let mut violations = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => violations_from(&errors),
        };

        if !self.identifier.is_empty() && !self.identifier.chars().all(is_identifier_char) {
            violations.push(FieldViolation::new(
                "identifier",
                "charset",
                "may only contain letters, digits, '.', '_', '-', '@' and '+'",
            ));
        }
        let distinct: HashSet<char> = self.secret.chars().collect();
        if distinct.len() < SECRET_MIN_DISTINCT_CHARS {
            violations.push(FieldViolation::new(
                "secret",
                "weak",
                format!("must contain at least {} distinct characters", SECRET_MIN_DISTINCT_CHARS),
            ));
        }
        if !self.secret.is_empty() && self.secret.to_lowercase() == self.identifier {
            violations.push(FieldViolation::new(
                "secret",
                "matches_identifier",
                "must differ from the identifier",
            ));
        }

        if violations.is_empty() {
            Ok(self)
        } else {
            violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
            Err(AuthError::Validation(violations))
        }
    }
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    #[serde(alias = "password")]
    pub secret: String,
}

impl LoginRequest {
    /// Shape check only: both fields present. Strength rules do not apply at login.
    pub fn validated(mut self) -> AuthResult<Self> {
        self.identifier = normalize_identifier(&self.identifier);
        let mut violations = Vec::new();
        if self.identifier.is_empty() {
            violations.push(FieldViolation::new("identifier", "required", "must not be empty"));
        }
        if self.secret.is_empty() {
            violations.push(FieldViolation::new("secret", "required", "must not be empty"));
        }
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(AuthError::Validation(violations))
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+')
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn violations_from(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut out = Vec::new();
    for (field, errs) in errors.field_errors() {
        for e in errs.iter() {
            let message = match &e.message {
                Some(m) => m.to_string(),
                None => match &*e.code {
                    "length" => {
                        let min = e.params.get("min").map(|v| v.to_string()).unwrap_or_default();
                        let max = e.params.get("max").map(|v| v.to_string()).unwrap_or_default();
                        format!("length must be between {} and {}", min, max)
                    }
                    "email" => "must be a valid email address".to_string(),
                    other => format!("failed {} check", other),
                },
            };
            out.push(FieldViolation::new(field.to_string(), e.code.to_string(), message));
        }
    }
    out
}
