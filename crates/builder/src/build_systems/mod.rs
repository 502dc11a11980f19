//! Build system abstraction
//!
//! A build system knows how to turn formula arguments into a configure
//! command line and how to drive compilation. CMake is the only one a
//! formula can name today.

use async_trait::async_trait;
use formula_errors::Error;
use std::path::PathBuf;

mod cmake;
mod core;

pub use self::core::{
    build_environment, tail_lines, BuildCommandResult, BuildSystemContext, OUTPUT_TAIL_LINES,
};
pub use cmake::CMakeBuildSystem;

use crate::formula::BuildSystemKind;

/// Trait for build system implementations
#[async_trait]
pub trait BuildSystem: Send + Sync {
    /// Program run for configure and compile
    fn program(&self) -> &std::path::Path;

    /// Full configure argument list for `user_args`
    fn configure_args(&self, ctx: &BuildSystemContext, user_args: &[String]) -> Vec<String>;

    /// Full compile argument list
    fn build_args(&self, ctx: &BuildSystemContext) -> Vec<String>;

    /// Configure phase
    async fn configure(&self, ctx: &BuildSystemContext, user_args: &[String]) -> Result<(), Error>;

    /// Build phase
    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Get build system name
    fn name(&self) -> &'static str;
}

/// Instantiate the build system a formula names
#[must_use]
pub fn build_system_for(kind: BuildSystemKind, program: PathBuf) -> Box<dyn BuildSystem> {
    match kind {
        BuildSystemKind::Cmake => Box::new(CMakeBuildSystem::new(program)),
    }
}
