//! Resolved install plan
//!
//! The plan is pure data computed from a formula, the run settings and a
//! scratch path. `formula check` prints it; the pipeline executes it.

use crate::build_systems::{build_environment, build_system_for, BuildSystem, BuildSystemContext};
use crate::formula::{expand_placeholders, FetchSpec, Formula, PlaceholderVars, UnpackTarget};
use crate::settings::BuildSettings;
use formula_events::EventSender;
use formula_types::ArtifactCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const DOWNLOADS_DIR: &str = "downloads";
const SOURCE_DIR: &str = "source";

/// One archive with its on-disk locations
#[derive(Debug, Clone, Serialize)]
pub struct PlannedArchive {
    pub url: String,
    pub archive: String,
    pub format: formula_types::ArchiveFormat,
    pub digest: formula_hash::Digest,
    pub download_path: PathBuf,
    pub unpack_dir: PathBuf,
    /// Strip a single top-level directory while unpacking
    pub strip_top_level: bool,
}

/// A command line with its working directory
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl fmt::Display for PlannedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One artifact copy
#[derive(Debug, Clone, Serialize)]
pub struct PlannedInstall {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: ArtifactCategory,
}

/// Everything a run will do, in order
#[derive(Debug, Clone, Serialize)]
pub struct InstallPlan {
    pub formula: String,
    pub version: String,
    pub scratch_dir: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub archives: Vec<PlannedArchive>,
    /// Configure arguments after placeholder expansion, before standard args
    pub formula_args: Vec<String>,
    pub configure: PlannedCommand,
    pub compile: PlannedCommand,
    pub installs: Vec<PlannedInstall>,
    pub env: BTreeMap<String, String>,
    pub jobs: usize,
    #[serde(skip)]
    context: BuildSystemContext,
}

impl InstallPlan {
    /// Resolve every path and command line for a run in `scratch_dir`
    #[must_use]
    pub fn new(formula: &Formula, settings: &BuildSettings, scratch_dir: &Path) -> Self {
        let source_dir = scratch_dir.join(SOURCE_DIR);
        let build_dir = source_dir.join(&formula.build.directory);
        let downloads = scratch_dir.join(DOWNLOADS_DIR);

        let archives = formula
            .archives()
            .map(|spec| plan_archive(spec, &downloads, &source_dir, &build_dir))
            .collect();

        let vars = placeholder_vars(formula, settings, &source_dir, &build_dir);
        let formula_args: Vec<String> = formula
            .build
            .args
            .iter()
            .map(|arg| expand_placeholders(arg, &vars))
            .collect();

        let env = build_environment(
            settings.source_date_epoch,
            settings.toolchain.cc.as_deref(),
            settings.toolchain.cxx.as_deref(),
        );

        let context = BuildSystemContext {
            source_dir: source_dir.clone(),
            build_dir: build_dir.clone(),
            prefix: settings.prefix.clone(),
            jobs: settings.jobs,
            env: env.clone(),
            event_sender: None,
        };

        let system = build_system_for(formula.build.system, settings.cmake.clone());
        let configure = PlannedCommand {
            program: system.program().to_path_buf(),
            args: system.configure_args(&context, &formula_args),
            working_dir: build_dir.clone(),
        };
        let compile = PlannedCommand {
            program: system.program().to_path_buf(),
            args: system.build_args(&context),
            working_dir: build_dir.clone(),
        };

        let installs = formula
            .install
            .iter()
            .map(|artifact| {
                let source = build_dir.join(&artifact.path);
                let file_name = source.file_name().map(PathBuf::from).unwrap_or_default();
                PlannedInstall {
                    destination: settings
                        .prefix
                        .join(artifact.category.dir_name())
                        .join(file_name),
                    source,
                    category: artifact.category,
                }
            })
            .collect();

        Self {
            formula: formula.name.clone(),
            version: formula.version.clone(),
            scratch_dir: scratch_dir.to_path_buf(),
            source_dir,
            build_dir,
            archives,
            formula_args,
            configure,
            compile,
            installs,
            env,
            jobs: settings.jobs,
            context,
        }
    }

    /// Build system context for executing this plan
    #[must_use]
    pub fn context(&self, event_sender: Option<EventSender>) -> BuildSystemContext {
        BuildSystemContext {
            event_sender,
            ..self.context.clone()
        }
    }

    /// Directory archives are downloaded into
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.scratch_dir.join(DOWNLOADS_DIR)
    }
}

fn plan_archive(
    spec: &FetchSpec,
    downloads: &Path,
    source_dir: &Path,
    build_dir: &Path,
) -> PlannedArchive {
    let (unpack_dir, strip_top_level) = match &spec.target {
        UnpackTarget::Source => (source_dir.to_path_buf(), true),
        UnpackTarget::BuildDir(None) => (build_dir.to_path_buf(), false),
        UnpackTarget::BuildDir(Some(sub)) => (build_dir.join(sub), false),
    };

    PlannedArchive {
        url: spec.url.clone(),
        archive: spec.archive.clone(),
        format: spec.format,
        digest: spec.digest.clone(),
        download_path: downloads.join(&spec.archive),
        unpack_dir,
        strip_top_level,
    }
}

fn placeholder_vars(
    formula: &Formula,
    settings: &BuildSettings,
    source_dir: &Path,
    build_dir: &Path,
) -> PlaceholderVars {
    let mut vars = PlaceholderVars::new();
    vars.insert("NAME", formula.name.clone());
    vars.insert("VERSION", formula.version.clone());
    vars.insert("PREFIX", settings.prefix.display().to_string());
    vars.insert("BIN", settings.bin_dir().display().to_string());
    vars.insert("LIB", settings.lib_dir().display().to_string());
    vars.insert("SOURCE_DIR", source_dir.display().to_string());
    vars.insert("BUILD_DIR", build_dir.display().to_string());
    vars.insert("JOBS", settings.jobs.to_string());
    vars
}

/// Boxed build system for a plan's formula
#[must_use]
pub fn build_system(formula: &Formula, settings: &BuildSettings) -> Box<dyn BuildSystem> {
    build_system_for(formula.build.system, settings.cmake.clone())
}
