//! Shopkeep - storefront REST backend

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopkeep::auth::TokenService;
use shopkeep::config::AppConfig;
use shopkeep::services::{EventPublisher, Services};
use shopkeep::store::{InMemoryStore, PgDocumentStore, SharedStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let pg = PgDocumentStore::connect(url, config.max_connections).await.context("connecting to Postgres")?;
            tracing::info!(max_connections = config.max_connections, "using Postgres document store");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; data is kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; domain events will only be logged");
                None
            }
        },
        None => None,
    };

    let tokens = TokenService::new(config.secret_key.as_bytes(), config.token_ttl()?);
    let services = Services::new(store, tokens, EventPublisher::new(nats));
    let admin_password = config.seed_admin.then_some(config.admin_password.as_str());
    shopkeep::seed::run(&services, admin_password).await?;

    let app = shopkeep::http::router(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Shopkeep listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
