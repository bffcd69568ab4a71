//! Configuration loading from files.
//!
//! The YAML file is layered with `FOLIO_`-prefixed environment variables
//! (nested keys separated by `__`, e.g. `FOLIO_SITE__BASE_URL=/blog/`).

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};
use tracing::info;

use super::{ConfigError, SiteConfig};

/// Config file looked up when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "folio.yaml";

impl SiteConfig {
    /// Load the config from the command line argument, defaulting to `folio.yaml`
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from_file(&config_path_from_arg(config_file)?)
    }

    /// Load the config from a file path.
    ///
    /// A missing file is not an error: every setting has a default.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::EncodePath(path.to_path_buf()))?;

        if !path.exists() {
            info!("no config found at {}, using defaults", path.display());
        }

        let mut config: SiteConfig = config::Config::builder()
            .add_source(File::new(path_str, FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix("FOLIO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.root = base_path_from_config(path);
        Ok(config)
    }
}

/// Absolute path of the config file named on the command line, defaulting
/// to `folio.yaml` in the working directory.
pub fn config_path_from_arg(config_file: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if path.is_relative() {
        Ok(std::env::current_dir()
            .map_err(ConfigError::CwdFailure)?
            .join(path))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
