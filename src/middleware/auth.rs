//! Bearer token extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use tracing::debug;

use crate::error::AppError;

/// Raw bearer token from `Authorization: Bearer <token>`. Not yet validated.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    debug!(reason = %e, "rejected request: missing or malformed bearer");
                    AppError::MissingBearer
                })?;
        Ok(BearerToken(bearer.token().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_bearer_token() {
        let token = extract(Some("Bearer abc123")).await.ok().unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[tokio::test]
    async fn missing_or_wrong_scheme_is_rejected() {
        assert!(matches!(extract(None).await, Err(AppError::MissingBearer)));
        assert!(matches!(
            extract(Some("Basic dXNlcjpwYXNz")).await,
            Err(AppError::MissingBearer)
        ));
    }
}
