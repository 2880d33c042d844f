use actix_web::{web, App, HttpServer};
use chrono::Local;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod metrics;
mod repository;
mod service;
mod session;
mod store;

use api::AppState;
use config::AppConfig;
use store::{Dataset, InMemoryStore, OrderStore, PgStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=shop_orders_api=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shop_orders_api=debug"))
        )
        .init();

    tracing::info!("🚀 Starting shop orders API");

    let config = AppConfig::from_env()?;
    tracing::debug!(
        http_port = config.http_port,
        metrics_port = config.metrics_port,
        database = config.database_url.is_some(),
        "Configuration loaded"
    );

    // === 1. Order store ===
    let store = build_store(&config).await?;

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let metrics_server = metrics::metrics_server(
        Arc::new(metrics.registry().clone()),
        store.clone(),
        &config.http_host,
        config.metrics_port,
    )?;

    // === 3. API server ===
    let state = web::Data::new(AppState::new(store, metrics, config.batch_fetch_size));
    tracing::info!(
        "🌐 Serving API on http://{}:{}/api (batch fetch size {})",
        config.http_host,
        config.http_port,
        config.batch_fetch_size
    );

    let api_server = HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind((config.http_host.as_str(), config.http_port))?
        .run();

    futures_util::future::try_join(api_server, metrics_server).await?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn OrderStore>> {
    let seed = if config.seed_sample_data {
        Dataset::sample(Local::now().naive_local())?
    } else {
        Dataset::default()
    };

    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.install_schema().await?;
            if config.seed_sample_data && store.seed(&seed).await? {
                tracing::info!(orders = seed.orders.len(), "Sample data inserted");
            }
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, serving from the in-memory store");
            Ok(Arc::new(InMemoryStore::new(seed)))
        }
    }
}
