#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for formula
//!
//! Small value types shared by the errors, events, config and builder crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the install pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Integrity,
    Unpack,
    Configure,
    Build,
    Install,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 6] = [
        Stage::Fetch,
        Stage::Integrity,
        Stage::Unpack,
        Stage::Configure,
        Stage::Build,
        Stage::Install,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Integrity => "integrity",
            Self::Unpack => "unpack",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install destination category for a build artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    /// Executable, installed into `<prefix>/bin`
    Bin,
    /// Shared library, installed into `<prefix>/lib`
    Lib,
}

impl ArtifactCategory {
    /// Directory name under the install prefix
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Lib => "lib",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Archive container formats the unpacker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    /// Infer the format from an archive file name
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Whether the leading bytes of a file look like this format
    #[must_use]
    pub fn matches_magic(self, header: &[u8]) -> bool {
        match self {
            Self::Zip => header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06"),
            Self::TarGz => header.starts_with(&[0x1f, 0x8b]),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => f.write_str("zip"),
            Self::TarGz => f.write_str("tar.gz"),
        }
    }
}

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStage {
    #[default]
    Build,
    Runtime,
}

impl fmt::Display for DependencyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => f.write_str("build"),
            Self::Runtime => f.write_str("runtime"),
        }
    }
}

/// Compiler family selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerId {
    /// Let the build-plan generator detect the compiler
    #[default]
    Auto,
    Gcc,
    Clang,
}

impl std::str::FromStr for CompilerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "gcc" => Ok(Self::Gcc),
            "clang" => Ok(Self::Clang),
            other => Err(format!("unknown compiler id: {other}")),
        }
    }
}

impl fmt::Display for CompilerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Gcc => f.write_str("gcc"),
            Self::Clang => f.write_str("clang"),
        }
    }
}

impl clap::ValueEnum for CompilerId {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Auto, Self::Gcc, Self::Clang]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Gcc => clap::builder::PossibleValue::new("gcc"),
            Self::Clang => clap::builder::PossibleValue::new("clang"),
        })
    }
}

/// Scratch directory retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepScratch {
    /// Always remove the scratch directory
    #[default]
    Never,
    /// Keep it only when the pipeline fails
    OnFailure,
    /// Always keep it
    Always,
}

impl KeepScratch {
    #[must_use]
    pub fn should_keep(self, succeeded: bool) -> bool {
        match self {
            Self::Never => false,
            Self::OnFailure => !succeeded,
            Self::Always => true,
        }
    }
}

impl std::str::FromStr for KeepScratch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "on_failure" | "on-failure" => Ok(Self::OnFailure),
            "always" => Ok(Self::Always),
            other => Err(format!("unknown keep-scratch mode: {other}")),
        }
    }
}

impl clap::ValueEnum for KeepScratch {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Never, Self::OnFailure, Self::Always]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Never => clap::builder::PossibleValue::new("never"),
            Self::OnFailure => clap::builder::PossibleValue::new("on-failure"),
            Self::Always => clap::builder::PossibleValue::new("always"),
        })
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert_eq!(Stage::Configure.to_string(), "configure");
    }

    #[test]
    fn test_archive_format_inference() {
        assert_eq!(
            ArchiveFormat::from_file_name("dcmtk-3.6.2.zip"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::from_file_name("boost_1_69_0.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::from_file_name("src.TGZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_file_name("src.tar.xz"), None);
    }

    #[test]
    fn test_archive_magic() {
        assert!(ArchiveFormat::Zip.matches_magic(b"PK\x03\x04rest"));
        assert!(!ArchiveFormat::Zip.matches_magic(&[0x1f, 0x8b, 0x08]));
        assert!(ArchiveFormat::TarGz.matches_magic(&[0x1f, 0x8b, 0x08]));
        assert!(!ArchiveFormat::TarGz.matches_magic(b""));
    }

    #[test]
    fn test_archive_format_serde() {
        let f: ArchiveFormat = serde_json::from_str("\"tgz\"").unwrap();
        assert_eq!(f, ArchiveFormat::TarGz);
        assert_eq!(serde_json::to_string(&ArchiveFormat::TarGz).unwrap(), "\"tar.gz\"");
    }

    #[test]
    fn test_keep_scratch_policy() {
        assert!(!KeepScratch::Never.should_keep(false));
        assert!(KeepScratch::OnFailure.should_keep(false));
        assert!(!KeepScratch::OnFailure.should_keep(true));
        assert!(KeepScratch::Always.should_keep(true));
        assert_eq!("on-failure".parse::<KeepScratch>(), Ok(KeepScratch::OnFailure));
    }

    #[test]
    fn test_compiler_id_parse() {
        assert_eq!("GCC".parse::<CompilerId>(), Ok(CompilerId::Gcc));
        assert_eq!("".parse::<CompilerId>(), Ok(CompilerId::Auto));
        assert!("msvc".parse::<CompilerId>().is_err());
    }
}
