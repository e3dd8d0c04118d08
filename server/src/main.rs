//! innohub server: reads settings from the environment (and `.env`), prepares the store,
//! and serves the REST API.
//!
//! Run from repo root: `cargo run -p innohub-server`

use innohub::{
    app, apply_migrations, ensure_database_exists, validate_catalog, AppState, MemoryStore, PgStore, Settings,
    Store, StoreKind,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("innohub=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    validate_catalog()?;

    let store: Arc<dyn Store> = match settings.store {
        StoreKind::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.database_url)
                .await?;
            apply_migrations(&pool, &settings.schema).await?;
            Arc::new(PgStore::new(pool, settings.schema.clone()))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let router = app(AppState::new(store), settings.body_limit);
    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!("innohub listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("innohub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
