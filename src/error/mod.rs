//! Error types: the closed auth taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One violated constraint on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Every failure the auth core can report. Storage and hashing faults are
/// folded into these kinds before they leave the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("identifier already taken")]
    IdentifierTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token expired")]
    TokenExpired,

    #[error("token invalid")]
    TokenInvalid,

    #[error("corrupt credential record")]
    CorruptCredentialRecord,

    #[error("service unavailable")]
    ServiceUnavailable,
}

impl AuthError {
    /// Stable machine-readable kind, used in response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::IdentifierTaken => "identifier_taken",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::CorruptCredentialRecord => "internal_error",
            AuthError::ServiceUnavailable => "service_unavailable",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Transport-level errors: auth failures plus request decoding problems.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Missing or invalid Authorization header")]
    MissingBearer,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Payload(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Invalid payload: {}", msg), "kind": "malformed_payload" }),
            ),
            AppError::MissingBearer => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string(), "kind": "token_invalid" }),
            ),
            AppError::Auth(err) => auth_error_body(err),
        };
        (status, Json(body)).into_response()
    }
}

fn auth_error_body(err: &AuthError) -> (StatusCode, serde_json::Value) {
    let kind = err.kind();
    match err {
        AuthError::Validation(fields) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Validation failed", "kind": kind, "fields": fields }),
        ),
        AuthError::IdentifierTaken => (
            StatusCode::CONFLICT,
            json!({
                "error": "Identifier already registered",
                "kind": kind,
                "fields": [FieldViolation::new("identifier", "taken", "identifier is already registered")],
            }),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Invalid identifier or secret", "kind": kind }),
        ),
        AuthError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Token expired", "kind": kind }),
        ),
        AuthError::TokenInvalid => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Token invalid", "kind": kind }),
        ),
        AuthError::ServiceUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": "Service temporarily unavailable", "kind": kind }),
        ),
        AuthError::CorruptCredentialRecord => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Internal error", "kind": kind }),
        ),
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_record_does_not_leak_its_kind() {
        let (status, body) = auth_error_body(&AuthError::CorruptCredentialRecord);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "internal_error");
        assert!(!body.to_string().contains("credential"));
    }

    #[test]
    fn validation_body_lists_every_field() {
        let err = AuthError::Validation(vec![
            FieldViolation::new("identifier", "length", "too short"),
            FieldViolation::new("secret", "length", "too short"),
        ]);
        let (status, body) = auth_error_body(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn conflict_maps_to_409() {
        let (status, body) = auth_error_body(&AuthError::IdentifierTaken);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["fields"][0]["field"], "identifier");
    }
}
