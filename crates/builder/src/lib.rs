#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Formula loading and the source install pipeline
//!
//! A formula is a YAML description of one native program: where its
//! sources live, which digests pin them, how to configure and build them
//! with CMake, and which artifacts land in the prefix. This crate parses
//! and validates formulas, resolves them into an [`InstallPlan`], and runs
//! that plan through the fetch, integrity, unpack, configure, build and
//! install stages.

mod build_systems;
mod deps;
mod fetch;
pub mod formula;
mod install;
mod lock;
mod pipeline;
mod plan;
mod scratch;
mod settings;
mod toolchain;
mod unpack;

pub use build_systems::{
    build_environment, tail_lines, BuildCommandResult, BuildSystem, BuildSystemContext,
    CMakeBuildSystem, OUTPUT_TAIL_LINES,
};
pub use deps::{probe_dependencies, DependencyStatus};
pub use fetch::{fetch_archive, fetch_to, verify_archive};
pub use formula::{
    archive_name_from_url, parse_formula_file, parse_formula_str, Formula, FetchSpec,
    UnpackTarget,
};
pub use install::install_artifacts;
pub use lock::{InstallLock, LockMetadata};
pub use pipeline::{fetch_only, InstallOutcome, Pipeline};
pub use plan::{build_system, InstallPlan, PlannedArchive, PlannedCommand, PlannedInstall};
pub use scratch::ScratchDir;
pub use settings::BuildSettings;
pub use toolchain::ResolvedToolchain;
pub use unpack::unpack_archive;
