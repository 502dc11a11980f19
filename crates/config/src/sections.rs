//! Configuration sections

use crate::constants;
use formula_types::{ColorChoice, CompilerId, KeepScratch};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub color: ColorChoice,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Install prefix; artifacts land in `<prefix>/bin` and `<prefix>/lib`
    #[serde(default = "default_prefix")]
    pub prefix: PathBuf,
    /// Parent directory for scratch directories (system temp when unset)
    #[serde(default)]
    pub build_root: Option<PathBuf>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            build_root: None,
        }
    }
}

/// Build behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub jobs: usize, // 0 = use formula value, else auto-detect
    #[serde(default)]
    pub keep_scratch: KeepScratch,
    #[serde(default = "default_source_date_epoch")]
    pub source_date_epoch: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            keep_scratch: KeepScratch::Never,
            source_date_epoch: constants::DEFAULT_SOURCE_DATE_EPOCH,
        }
    }
}

/// Compiler selection; `auto` defers to the formula
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub compiler_id: CompilerId,
    #[serde(default)]
    pub compiler_version: Option<String>,
}

/// External programs invoked by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_cmake")]
    pub cmake: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cmake: default_cmake(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

// Default value functions for serde
fn default_prefix() -> PathBuf {
    PathBuf::from(constants::DEFAULT_PREFIX)
}

fn default_source_date_epoch() -> u64 {
    constants::DEFAULT_SOURCE_DATE_EPOCH
}

fn default_cmake() -> PathBuf {
    PathBuf::from(constants::DEFAULT_CMAKE)
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}
