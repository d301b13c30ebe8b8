//! Authentication gateway: user registration, login, and opaque bearer tokens.
//!
//! The auth core (`services::AuthService`) depends only on the `Directory` and
//! `TokenStore` seams; Postgres, Redis, and in-memory backends plug in behind them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{AppError, AuthError};
pub use handlers::http::AppState;
pub use services::AuthService;

use axum::routing::{get, post};
use handlers::http;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router (root, health, register, login, logout, me). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(http::root))
        .route("/health", get(http::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
