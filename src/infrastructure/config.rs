use std::path::{Path, PathBuf};
use std::time::Duration;

use config::ConfigError;
use serde::{Deserialize, Serialize};

use super::source::SortOrder;
use crate::utils;

const CONFIG: &str = include_str!("../../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub _data_dir: PathBuf,
    #[serde(default)]
    pub _config_dir: PathBuf,
}

/// Tunables of the pagination engine
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub auto_fetch_max_rounds: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub server_fetch_timeout_ms: u64,
    pub client_slice_timeout_ms: u64,
    pub cache_capacity: usize,
    pub cache_ttl_ms: u64,
    pub store_capacity: usize,
    pub sort: SortOrder,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 15,
            auto_fetch_max_rounds: 3,
            max_retries: 3,
            retry_base_delay_ms: 500,
            server_fetch_timeout_ms: 2_000,
            client_slice_timeout_ms: 500,
            cache_capacity: 200,
            cache_ttl_ms: 300_000,
            store_capacity: 1_000,
            sort: SortOrder::Newest,
        }
    }
}

impl PaginationConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn server_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.server_fetch_timeout_ms)
    }

    pub fn client_slice_timeout(&self) -> Duration {
        Duration::from_millis(self.client_slice_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Message(String::from(
                "pagination.page_size must be at least 1",
            )));
        }
        if self.store_capacity < self.page_size {
            return Err(ConfigError::Message(format!(
                "pagination.store_capacity ({}) must hold at least one page ({})",
                self.store_capacity, self.page_size
            )));
        }
        if self.server_fetch_timeout_ms == 0 {
            return Err(ConfigError::Message(String::from(
                "pagination.server_fetch_timeout_ms must be positive",
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Config {
    /// Load from the user config directory
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_from(&utils::get_config_dir())
    }

    /// Embedded defaults, then any `config.*` file in `config_dir`, then
    /// `FEEDPAGER_*` environment variables (`FEEDPAGER_PAGINATION__PAGE_SIZE=20`).
    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        let data_dir = utils::get_data_dir();
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5))
            .set_default("_data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("_config_dir", config_dir.to_string_lossy().to_string())?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            builder = builder.add_source(
                config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false),
            );
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            log::info!(
                "No configuration file found in {}, using defaults",
                config_dir.display()
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&utils::paths::PROJECT_NAME)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.pagination.validate()?;
        Ok(cfg)
    }

    /// The embedded defaults alone
    pub fn embedded() -> Result<Self, ConfigError> {
        json5::from_str(CONFIG)
            .map_err(|e| ConfigError::Message(format!("Failed to load default config: {e}")))
    }
}
