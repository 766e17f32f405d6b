//! CLI configuration
//!
//! Layered as: built-in defaults, then `cobalt.toml` (or the file named by
//! `COBALT_CONFIG` / `--config`), then `COBALT__SECTION__KEY` environment
//! variables. A `.env` file is read before the environment layer.

use cobalt_engine::{EngineConfig, GlobalSearchConfig};
use cobalt_transport::HttpTransportConfig;
use config::{ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "COBALT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "cobalt";
const ENV_PREFIX: &str = "COBALT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: HttpTransportConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub global_search: GlobalSearchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the workspace crates when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// `daily`, `hourly`, `minutely` or `never`.
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "cobalt".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let file = match explicit {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend.url.trim().is_empty() {
            anyhow::bail!("backend.url must not be empty");
        }
        if self.engine.result_window == 0 {
            anyhow::bail!("engine.result_window must be greater than zero");
        }
        if self.engine.max_concurrent_categories == 0 {
            anyhow::bail!("engine.max_concurrent_categories must be greater than zero");
        }
        for category in &self.global_search.categories {
            if category.searchable_fields.is_empty() {
                anyhow::bail!(
                    "global_search category '{}' has no searchable fields",
                    category.category_tag
                );
            }
        }
        Ok(())
    }
}
