//! Service entry point: config → logging → database → pipeline wiring →
//! HTTP trigger surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use catalog_sync::api::{create_router, AppState};
use catalog_sync::application::{CatalogReconciler, RunLockRegistry, SyncOrchestrator};
use catalog_sync::infrastructure::{
    apply_env_overrides, init_logging_with_config, ConfigManager, DatabaseConnection,
    SqliteCatalogRepository, VendorClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    let manager = ConfigManager::new()?;
    let mut config = manager.initialize_on_first_run().await?;
    apply_env_overrides(&mut config);

    init_logging_with_config(&config.logging)?;
    info!("starting catalog-sync service");

    let db = DatabaseConnection::with_max_connections(
        &config.database.url,
        config.database.max_connections,
    )
    .await?;
    db.migrate().await?;

    let repo = Arc::new(SqliteCatalogRepository::new(db.pool().clone()));
    let fetcher = Arc::new(VendorClient::new(&config.vendor, &config.sync)?);
    let orchestrator = Arc::new(SyncOrchestrator::new(
        fetcher,
        CatalogReconciler::new(repo.clone()),
        repo.clone(),
        RunLockRegistry::new(),
    ));

    let state = AppState {
        orchestrator,
        source: config.sync.source.clone(),
        pool: db.pool().clone(),
    };
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "listening for sync triggers");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("catalog-sync service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to install ctrl-c handler");
    }
}
