//! Configuration infrastructure.
//!
//! Nested serde configuration loaded from a JSON file under the platform
//! config directory, created with defaults on first run. Secrets and the
//! database URL can be overridden from the environment so deployments never
//! have to write credentials to disk.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub vendor: VendorConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Vendor API endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Base URL of the vendor catalog API.
    pub base_url: String,
    /// Store/account credentials sent as request headers.
    pub store_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Items requested per page; a short page ends pagination.
    pub page_size: u32,
    /// Hard cap on pages per run so a misbehaving vendor cannot loop the
    /// fetcher forever.
    pub max_pages: u32,
    pub request_timeout_seconds: u64,
    /// Pacing between page requests.
    pub max_requests_per_second: u32,
}

/// Sync run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Checkpoint key for this vendor source.
    pub source: String,
    /// When set, each run archives the raw vendor payload here before
    /// normalization. Diagnostics only; archiving failures are warnings.
    pub snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,
    /// Emit JSON formatted logs instead of plain text.
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Directory for log files when file output is enabled.
    pub file_dir: Option<PathBuf>,
    /// Module-specific level filters, e.g. "sqlx": "warn".
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vendor: VendorConfig::default(),
            sync: SyncConfig::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::VENDOR_BASE_URL.to_string(),
            store_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            page_size: defaults::PAGE_SIZE,
            max_pages: defaults::MAX_PAGES,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: defaults::SOURCE.to_string(),
            snapshot_dir: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        module_filters.insert("sqlx".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "info".to_string());
        module_filters.insert("hyper".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            file_dir: None,
            module_filters,
        }
    }
}

/// Default configuration values.
pub mod defaults {
    /// Vendor catalog API base URL.
    pub const VENDOR_BASE_URL: &str = "https://open-api.example-vendor.com/v4";

    /// Checkpoint source key.
    pub const SOURCE: &str = "vendor";

    /// Items per page.
    pub const PAGE_SIZE: u32 = 50;

    /// Page cap per run.
    pub const MAX_PAGES: u32 = 200;

    /// HTTP request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Page requests per second toward the vendor.
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// SQLite database URL.
    pub const DATABASE_URL: &str = "sqlite:data/catalog.db";

    /// Connection pool size.
    pub const DB_MAX_CONNECTIONS: u32 = 10;

    /// HTTP trigger bind address.
    pub const SERVER_HOST: &str = "127.0.0.1";

    /// HTTP trigger port.
    pub const SERVER_PORT: u16 = 8088;
}

/// Loads and persists `AppConfig` as JSON under the platform config dir.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory.
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("catalog-sync");

        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("catalog_sync_config.json");
        Ok(Self { config_path })
    }

    /// For tests and ad-hoc deployments: manage a config file at an explicit
    /// path instead of the platform default.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Initialize the configuration on first run: create the directory,
    /// write defaults when no file exists, otherwise load what is there.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("Failed to get config directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !self.config_path.exists() {
            info!("First run detected, writing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        self.load_config().await
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        let config: AppConfig =
            serde_json::from_str(&content).context("Failed to parse configuration file")?;
        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        Ok(())
    }
}

/// Environment overrides, applied after loading so secrets never need to
/// live in the config file: `VENDOR_STORE_NAME`, `VENDOR_API_KEY`,
/// `VENDOR_API_SECRET`, `DATABASE_URL`.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(store_name) = std::env::var("VENDOR_STORE_NAME") {
        config.vendor.store_name = store_name;
    }
    if let Ok(api_key) = std::env::var("VENDOR_API_KEY") {
        config.vendor.api_key = api_key;
    }
    if let Ok(api_secret) = std::env::var("VENDOR_API_SECRET") {
        config.vendor.api_secret = api_secret;
    }
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        config.database.url = database_url;
    }
}
