//! Entry point: load config, wire dependencies, and run the server.

use gatekeep::auth::{CredentialHasher, TokenIssuer};
use gatekeep::config::Config;
use gatekeep::db::{self, PgDirectory};
use gatekeep::repositories::{
    Directory, InMemoryDirectory, InMemoryTokenStore, RedisTokenStore, TokenStore,
};
use gatekeep::services::AuthService;
use gatekeep::{create_app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let directory: Arc<dyn Directory> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.store_timeout).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("identity directory: postgres");
            Arc::new(PgDirectory::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL unset; identities are kept in memory");
            Arc::new(InMemoryDirectory::new())
        }
    };

    let token_store: Arc<dyn TokenStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("token store: redis");
            Arc::new(RedisTokenStore::new(url, config.token_ttl)?)
        }
        None => {
            tracing::warn!("REDIS_URL unset; tokens are kept in memory");
            Arc::new(InMemoryTokenStore::new())
        }
    };

    let hasher = CredentialHasher::new(config.hasher)
        .map_err(|e| anyhow::anyhow!("hasher: {}", e))?;
    let tokens = TokenIssuer::new(token_store, config.token_ttl, config.store_timeout);
    let auth_service = AuthService::new(directory, hasher, tokens, config.store_timeout);

    let app = create_app(AppState::new(auth_service));

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
