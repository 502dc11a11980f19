//! Formula loading
//!
//! A formula is loaded in two steps: `serde_yml` produces the raw
//! [`FormulaFile`], then [`parser`] validates it and converts it into a
//! [`Formula`] whose archives carry parsed digests and resolved formats.
//! Nothing downstream ever sees an unvalidated formula.

pub mod model;
pub mod parser;
mod placeholders;

pub use model::{
    Build, BuildSystemKind, Checksum, Dependency, FormulaFile, InstallArtifact, Metadata,
    Resource, Toolchain,
};
pub use parser::{archive_name_from_url, parse_formula_file, parse_formula_str};
pub use placeholders::{expand_placeholders, PlaceholderVars, PLACEHOLDERS};

use formula_hash::Digest;
use formula_types::ArchiveFormat;
use std::path::PathBuf;

/// A validated formula
#[derive(Debug, Clone)]
pub struct Formula {
    pub name: String,
    pub description: String,
    pub version: String,
    pub homepage: String,
    pub dependencies: Vec<Dependency>,
    /// Main source archive
    pub source: FetchSpec,
    /// Additional archives, in declared order
    pub resources: Vec<FetchSpec>,
    pub toolchain: Toolchain,
    pub build: Build,
    pub install: Vec<InstallArtifact>,
}

impl Formula {
    /// Every archive in fetch order: main source first, then resources
    pub fn archives(&self) -> impl Iterator<Item = &FetchSpec> {
        std::iter::once(&self.source).chain(self.resources.iter())
    }
}

/// Where an archive's contents go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackTarget {
    /// `<scratch>/source`, with a single top-level directory stripped
    Source,
    /// Inside the build directory, optionally in a subdirectory; not stripped
    BuildDir(Option<PathBuf>),
}

/// One archive to fetch, verify and unpack
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: String,
    /// File name the archive is stored under
    pub archive: String,
    pub format: ArchiveFormat,
    pub digest: Digest,
    pub target: UnpackTarget,
}
