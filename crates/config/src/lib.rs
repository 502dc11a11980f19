#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for formula
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/formula/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod sections;

pub use sections::{BuildConfig, GeneralConfig, NetworkConfig, PathConfig, ToolchainConfig, ToolsConfig};

use formula_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        // No config dir (e.g. no HOME) just means no user config
        let Ok(config_path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file and a missing file is an
    /// error. If path is None, the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge values produced by `lookup`, keyed by environment variable name
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed into the expected type.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |field: &str, value: String| -> Error {
            ConfigError::InvalidValue {
                field: field.to_string(),
                value,
            }
            .into()
        };

        if let Some(prefix) = lookup(constants::ENV_PREFIX) {
            self.paths.prefix = PathBuf::from(prefix);
        }

        if let Some(root) = lookup(constants::ENV_BUILD_ROOT) {
            self.paths.build_root = Some(PathBuf::from(root));
        }

        if let Some(jobs) = lookup(constants::ENV_JOBS) {
            self.build.jobs = jobs
                .parse()
                .map_err(|_| invalid(constants::ENV_JOBS, jobs))?;
        }

        if let Some(compiler) = lookup(constants::ENV_COMPILER) {
            self.toolchain.compiler_id = compiler
                .parse()
                .map_err(|_| invalid(constants::ENV_COMPILER, compiler))?;
        }

        if let Some(version) = lookup(constants::ENV_COMPILER_VERSION) {
            self.toolchain.compiler_version = Some(version).filter(|v| !v.is_empty());
        }

        if let Some(keep) = lookup(constants::ENV_KEEP_SCRATCH) {
            self.build.keep_scratch = keep
                .parse()
                .map_err(|_| invalid(constants::ENV_KEEP_SCRATCH, keep))?;
        }

        if let Some(color) = lookup(constants::ENV_COLOR) {
            self.general.color = match color.as_str() {
                "always" => formula_types::ColorChoice::Always,
                "auto" => formula_types::ColorChoice::Auto,
                "never" => formula_types::ColorChoice::Never,
                _ => return Err(invalid(constants::ENV_COLOR, color)),
            };
        }

        Ok(())
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix or build root is relative, or a
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.paths.prefix.is_absolute() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "prefix must be an absolute path, got {}",
                    self.paths.prefix.display()
                ),
            }
            .into());
        }
        if let Some(root) = &self.paths.build_root {
            if !root.is_absolute() {
                return Err(ConfigError::Invalid {
                    message: format!("build_root must be an absolute path, got {}", root.display()),
                }
                .into());
            }
        }
        if self.network.timeout == 0 || self.network.connect_timeout == 0 {
            return Err(ConfigError::Invalid {
                message: "network timeouts must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Directory scratch directories are created in
    #[must_use]
    pub fn build_root(&self) -> PathBuf {
        self.paths
            .build_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Calculate build jobs based on CPU count
#[must_use]
pub fn calculate_build_jobs(config_value: usize) -> usize {
    if config_value > 0 {
        config_value // User override
    } else {
        // Auto-detect based on CPU count
        let cpus = num_cpus::get();

        // Use 75% of CPUs for builds, minimum 1
        (cpus * 3 / 4).max(1)
    }
}
