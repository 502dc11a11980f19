//! Dependency probing for `formula deps`
//!
//! Purely informational: the pipeline never gates on these results.

use crate::formula::Dependency;
use formula_types::DependencyStage;
use serde::Serialize;
use std::path::PathBuf;

/// Probe outcome for one declared dependency
#[derive(Debug, Clone, Serialize)]
pub struct DependencyStatus {
    pub name: String,
    pub stage: DependencyStage,
    /// Executable looked up on PATH
    pub probe: String,
    /// Resolved location, when found
    pub found: Option<PathBuf>,
}

/// Look up each dependency's probe executable on PATH
#[must_use]
pub fn probe_dependencies(deps: &[Dependency]) -> Vec<DependencyStatus> {
    deps.iter()
        .map(|dep| {
            let probe = dep.probe.clone().unwrap_or_else(|| dep.name.clone());
            let found = which::which(&probe).ok();
            tracing::debug!(dependency = %dep.name, probe = %probe, found = ?found, "probed");
            DependencyStatus {
                name: dep.name.clone(),
                stage: dep.stage,
                probe,
                found,
            }
        })
        .collect()
}
