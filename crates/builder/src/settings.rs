//! Effective run settings from user config and formula

use crate::formula::Formula;
use crate::toolchain::ResolvedToolchain;
use formula_config::{calculate_build_jobs, Config};
use formula_types::KeepScratch;
use std::path::PathBuf;

/// Everything a run needs besides the formula itself
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub prefix: PathBuf,
    pub build_root: PathBuf,
    pub jobs: usize,
    pub keep_scratch: KeepScratch,
    pub source_date_epoch: u64,
    pub cmake: PathBuf,
    pub toolchain: ResolvedToolchain,
}

impl BuildSettings {
    /// Combine `config` (already merged with env and CLI) with `formula`
    ///
    /// Parallelism: config jobs, else formula jobs, else 75% of CPUs.
    #[must_use]
    pub fn resolve(config: &Config, formula: &Formula) -> Self {
        let jobs = if config.build.jobs > 0 {
            config.build.jobs
        } else {
            calculate_build_jobs(formula.build.jobs)
        };

        Self {
            prefix: config.paths.prefix.clone(),
            build_root: config.build_root(),
            jobs,
            keep_scratch: config.build.keep_scratch,
            source_date_epoch: config.build.source_date_epoch,
            cmake: config.tools.cmake.clone(),
            toolchain: ResolvedToolchain::resolve(&formula.toolchain, &config.toolchain),
        }
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    #[must_use]
    pub fn lib_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }
}
