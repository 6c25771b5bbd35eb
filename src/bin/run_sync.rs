//! Oneshot sync runner: wires the same stack as the service, runs a single
//! sync pass to completion, and exits non-zero on failure.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

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

    let db = DatabaseConnection::with_max_connections(
        &config.database.url,
        config.database.max_connections,
    )
    .await?;
    db.migrate().await?;

    let repo = Arc::new(SqliteCatalogRepository::new(db.pool().clone()));
    let fetcher = Arc::new(VendorClient::new(&config.vendor, &config.sync)?);
    let orchestrator = SyncOrchestrator::new(
        fetcher,
        CatalogReconciler::new(repo.clone()),
        repo.clone(),
        RunLockRegistry::new(),
    );

    match orchestrator.run(&config.sync.source).await {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                incremental = report.incremental,
                items = report.items_fetched,
                touched = report.summary.products_touched,
                failed = report.summary.products_failed,
                pruned = report.summary.variants_pruned,
                skipped = report.skipped.total(),
                duration_ms = report.duration_ms(),
                "sync run finished"
            );
            Ok(())
        }
        Err(err) => {
            error!(%err, "sync run failed");
            std::process::exit(1);
        }
    }
}
