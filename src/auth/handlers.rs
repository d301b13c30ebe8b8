//! Auth HTTP handlers: register, login, logout, me.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::middleware::{BearerToken, Payload};
use crate::models::{LoginRequest, PublicProfile, RegistrationRequest};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub profile: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub profile: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub profile: PublicProfile,
    pub expires_at: DateTime<Utc>,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Payload(body): Payload<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let profile = state.auth_service().register(body).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { profile })))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Payload(body): Payload<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.auth_service().login(body).await?;
    Ok(Json(LoginResponse {
        token: session.token.value,
        expires_at: session.token.expires_at,
        profile: session.profile,
    }))
}

/// GET /me
pub async fn me(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<MeResponse>, AppError> {
    let (who, profile) = state.auth_service().profile(token.as_str()).await?;
    Ok(Json(MeResponse {
        profile,
        expires_at: who.expires_at,
    }))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<StatusCode, AppError> {
    state.auth_service().logout(token.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
