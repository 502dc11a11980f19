//! Built-in defaults shared by the config sections and the CLI

pub const DEFAULT_PREFIX: &str = "/usr/local";

/// 1980-01-01T00:00:00Z, the earliest timestamp zip archives can represent
pub const DEFAULT_SOURCE_DATE_EPOCH: u64 = 315_532_800;

pub const DEFAULT_CMAKE: &str = "cmake";

pub const CONFIG_DIR_NAME: &str = "formula";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_PREFIX: &str = "FORMULA_PREFIX";
pub const ENV_BUILD_ROOT: &str = "FORMULA_BUILD_ROOT";
pub const ENV_JOBS: &str = "FORMULA_JOBS";
pub const ENV_COMPILER: &str = "FORMULA_COMPILER";
pub const ENV_COMPILER_VERSION: &str = "FORMULA_COMPILER_VERSION";
pub const ENV_KEEP_SCRATCH: &str = "FORMULA_KEEP_SCRATCH";
pub const ENV_COLOR: &str = "FORMULA_COLOR";
