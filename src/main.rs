//! Group-buying storefront service

use anyhow::Result;
use groupbuy_commerce::{api, config::Config, messaging::Notifier, store::{memory::MemoryStore, postgres::PgStore, Store}};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.max_db_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, %url, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };

    let notifier = Notifier::new(nats);
    tracing::info!(events = notifier.is_enabled(), "event publishing");
    let state = api::AppState::new(store, notifier);
    if let Some(email) = &config.bootstrap_admin {
        state.accounts.bootstrap_admin(email).await?;
    }

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("groupbuy-commerce listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
