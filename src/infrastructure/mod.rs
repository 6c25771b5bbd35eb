//! Infrastructure layer: vendor HTTP client, configuration, logging, the
//! SQLite pool/migrations, and the sqlx repository implementation.

pub mod catalog_repository;
pub mod config;
pub mod database_connection;
pub mod logging;
pub mod vendor_client;

pub use catalog_repository::SqliteCatalogRepository;
pub use config::{apply_env_overrides, AppConfig, ConfigManager};
pub use database_connection::{run_migrations, DatabaseConnection};
pub use logging::{init_logging, init_logging_with_config};
pub use vendor_client::VendorClient;
