//! Command line interface definition

use clap::{Parser, Subcommand};
use formula_hash::DigestAlgorithm;
use formula_types::{ColorChoice, CompilerId, KeepScratch};
use std::path::PathBuf;

/// formula - build and install native programs from YAML formulas
#[derive(Parser)]
#[command(name = "formula")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and install native programs from YAML formulas")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Emit events and results as JSON lines on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, verify, unpack, build and install a formula
    #[command(alias = "i")]
    Install {
        /// Path to the formula file (.yml)
        formula: PathBuf,

        /// Install prefix
        #[arg(long, value_name = "DIR")]
        prefix: Option<PathBuf>,

        /// Number of parallel build jobs (0=auto)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Compiler family, overriding the formula
        #[arg(long, value_enum)]
        compiler: Option<CompilerId>,

        /// Compiler major version, overriding the formula
        #[arg(long, value_name = "V")]
        compiler_version: Option<String>,

        /// When to keep the scratch directory
        #[arg(long, value_enum, value_name = "MODE")]
        keep_scratch: Option<KeepScratch>,
    },

    /// Download and verify a formula's archives without building
    Fetch {
        /// Path to the formula file (.yml)
        formula: PathBuf,

        /// Directory to store the archives in
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Validate a formula and print the resolved plan
    Check {
        /// Path to the formula file (.yml)
        formula: PathBuf,
    },

    /// List declared dependencies and whether they are on PATH
    Deps {
        /// Path to the formula file (.yml)
        formula: PathBuf,
    },

    /// Print digests of local files
    Digest {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Digest algorithm
        #[arg(long, default_value_t = DigestAlgorithm::Sha256)]
        algorithm: DigestAlgorithm,
    },
}

impl Commands {
    /// Formula path for commands that take one
    pub fn formula_path(&self) -> Option<&std::path::Path> {
        match self {
            Commands::Install { formula, .. }
            | Commands::Fetch { formula, .. }
            | Commands::Check { formula }
            | Commands::Deps { formula } => Some(formula),
            Commands::Digest { .. } => None,
        }
    }
}
