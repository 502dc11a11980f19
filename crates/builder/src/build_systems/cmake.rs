//! CMake build system implementation

use super::{BuildSystem, BuildSystemContext};
use async_trait::async_trait;
use formula_errors::{Error, PipelineError};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// CMake build system
pub struct CMakeBuildSystem {
    program: PathBuf,
    default_configure_args: Vec<String>,
}

impl CMakeBuildSystem {
    /// Create a CMake build system that runs `program`
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            default_configure_args: vec![
                "-DCMAKE_INSTALL_LIBDIR=lib".to_string(),
                "-DCMAKE_BUILD_TYPE=Release".to_string(),
                "-DCMAKE_FIND_FRAMEWORK=LAST".to_string(),
                "-DCMAKE_VERBOSE_MAKEFILE=ON".to_string(),
                "-Wno-dev".to_string(),
                "-DBUILD_TESTING=OFF".to_string(),
            ],
        }
    }

    /// Source directory as seen from the build directory
    fn source_arg(ctx: &BuildSystemContext) -> String {
        match ctx.build_dir.strip_prefix(&ctx.source_dir) {
            Ok(rel) => {
                let depth = rel
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .count();
                if depth == 0 {
                    ".".to_string()
                } else {
                    vec![".."; depth].join("/")
                }
            }
            Err(_) => ctx.source_dir.display().to_string(),
        }
    }
}

/// `-DKEY=VALUE` and `-DKEY:TYPE=VALUE` yield `KEY`; anything else is its own key
fn arg_key(arg: &str) -> &str {
    match arg.strip_prefix("-D") {
        Some(rest) => rest.split(['=', ':']).next().unwrap_or(rest),
        None => arg,
    }
}

fn is_set(user_args: &[String], arg: &str) -> bool {
    let key = arg_key(arg);
    user_args.iter().any(|user| arg_key(user) == key)
}

#[async_trait]
impl BuildSystem for CMakeBuildSystem {
    fn program(&self) -> &Path {
        &self.program
    }

    /// Standard arguments, then compiler overrides from `CC`/`CXX`, then the
    /// formula's own arguments, then the source directory. Standard and
    /// compiler arguments are skipped when the formula sets the same key.
    fn configure_args(&self, ctx: &BuildSystemContext, user_args: &[String]) -> Vec<String> {
        let mut args = vec![];

        let install_prefix = format!("-DCMAKE_INSTALL_PREFIX={}", ctx.prefix.display());
        let compilers = [
            ("CC", "CMAKE_C_COMPILER"),
            ("CXX", "CMAKE_CXX_COMPILER"),
        ]
        .into_iter()
        .filter_map(|(var, key)| ctx.env.get(var).map(|value| format!("-D{key}={value}")));

        for arg in std::iter::once(install_prefix)
            .chain(self.default_configure_args.iter().cloned())
            .chain(compilers)
        {
            if !is_set(user_args, &arg) {
                args.push(arg);
            }
        }

        args.extend(user_args.iter().cloned());
        args.push(Self::source_arg(ctx));
        args
    }

    fn build_args(&self, ctx: &BuildSystemContext) -> Vec<String> {
        vec![
            "--build".to_string(),
            ".".to_string(),
            "--parallel".to_string(),
            ctx.jobs.max(1).to_string(),
        ]
    }

    async fn configure(&self, ctx: &BuildSystemContext, user_args: &[String]) -> Result<(), Error> {
        fs::create_dir_all(&ctx.build_dir)
            .await
            .map_err(|e| PipelineError::Configure {
                message: format!("cannot create {}: {e}", ctx.build_dir.display()),
                exit_code: None,
                output: String::new(),
            })?;

        let args = self.configure_args(ctx, user_args);
        let result = ctx
            .execute(&self.program, &args, &ctx.build_dir)
            .await
            .map_err(|e| PipelineError::Configure {
                message: format!("failed to run {}: {e}", self.program.display()),
                exit_code: None,
                output: String::new(),
            })?;

        if !result.success {
            return Err(PipelineError::Configure {
                message: format!(
                    "{} exited with status {}",
                    self.program.display(),
                    result
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string())
                ),
                exit_code: result.exit_code,
                output: result.diagnostic_tail(),
            }
            .into());
        }

        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let args = self.build_args(ctx);
        let result = ctx
            .execute(&self.program, &args, &ctx.build_dir)
            .await
            .map_err(|e| PipelineError::Build {
                message: format!("failed to run {}: {e}", self.program.display()),
                exit_code: None,
                output: String::new(),
            })?;

        if !result.success {
            return Err(PipelineError::Build {
                message: format!(
                    "{} --build exited with status {}",
                    self.program.display(),
                    result
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |c| c.to_string())
                ),
                exit_code: result.exit_code,
                output: result.diagnostic_tail(),
            }
            .into());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "cmake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx(env: BTreeMap<String, String>) -> BuildSystemContext {
        BuildSystemContext {
            source_dir: PathBuf::from("/scratch/source"),
            build_dir: PathBuf::from("/scratch/source/wsi-build"),
            prefix: PathBuf::from("/usr/local"),
            jobs: 6,
            env,
            event_sender: None,
        }
    }

    #[test]
    fn test_configure_args_order() {
        let env = BTreeMap::from([
            ("CC".to_string(), "gcc-9".to_string()),
            ("CXX".to_string(), "g++-9".to_string()),
        ]);
        let cmake = CMakeBuildSystem::new(PathBuf::from("cmake"));
        let args = cmake.configure_args(
            &ctx(env),
            &["-Dpkg_config_libdir=/usr/local/lib".to_string()],
        );
        assert_eq!(cmake.name(), "cmake");

        assert_eq!(
            args,
            vec![
                "-DCMAKE_INSTALL_PREFIX=/usr/local",
                "-DCMAKE_INSTALL_LIBDIR=lib",
                "-DCMAKE_BUILD_TYPE=Release",
                "-DCMAKE_FIND_FRAMEWORK=LAST",
                "-DCMAKE_VERBOSE_MAKEFILE=ON",
                "-Wno-dev",
                "-DBUILD_TESTING=OFF",
                "-DCMAKE_C_COMPILER=gcc-9",
                "-DCMAKE_CXX_COMPILER=g++-9",
                "-Dpkg_config_libdir=/usr/local/lib",
                "..",
            ]
        );
    }

    #[test]
    fn test_user_args_win() {
        let env = BTreeMap::from([("CC".to_string(), "gcc-9".to_string())]);
        let cmake = CMakeBuildSystem::new(PathBuf::from("cmake"));
        let args = cmake.configure_args(
            &ctx(env),
            &[
                "-DCMAKE_BUILD_TYPE:STRING=Debug".to_string(),
                "-DCMAKE_C_COMPILER=cc".to_string(),
            ],
        );

        assert!(!args.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(!args.contains(&"-DCMAKE_C_COMPILER=gcc-9".to_string()));
        assert!(args.contains(&"-DCMAKE_C_COMPILER=cc".to_string()));
        assert_eq!(args.last().map(String::as_str), Some(".."));
    }

    #[test]
    fn test_nested_build_dir() {
        let mut context = ctx(BTreeMap::new());
        context.build_dir = PathBuf::from("/scratch/source/out/release");
        assert_eq!(CMakeBuildSystem::source_arg(&context), "../..");
    }

    #[test]
    fn test_build_args() {
        let cmake = CMakeBuildSystem::new(PathBuf::from("cmake"));
        assert_eq!(
            cmake.build_args(&ctx(BTreeMap::new())),
            vec!["--build", ".", "--parallel", "6"]
        );
    }

    #[test]
    fn test_arg_key() {
        assert_eq!(arg_key("-DFOO=bar"), "FOO");
        assert_eq!(arg_key("-DFOO:BOOL=ON"), "FOO");
        assert_eq!(arg_key("-Wno-dev"), "-Wno-dev");
    }
}
