//! Core types and utilities for build systems

use formula_events::{EventEmitter, EventSender};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Lines of tool output kept in stage errors
pub const OUTPUT_TAIL_LINES: usize = 40;

/// Result of running an external command
#[derive(Debug, Clone)]
pub struct BuildCommandResult {
    /// Whether the command succeeded
    pub success: bool,
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl BuildCommandResult {
    /// Last lines of the diagnostic output, preferring stderr
    #[must_use]
    pub fn diagnostic_tail(&self) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        tail_lines(source, OUTPUT_TAIL_LINES)
    }
}

/// Build system context containing all necessary information for building
#[derive(Debug, Clone)]
pub struct BuildSystemContext {
    /// Unpacked main source
    pub source_dir: PathBuf,
    /// Out-of-source build directory
    pub build_dir: PathBuf,
    /// Installation prefix
    pub prefix: PathBuf,
    /// Number of parallel jobs
    pub jobs: usize,
    /// Complete environment of every command; nothing else is inherited
    pub env: BTreeMap<String, String>,
    /// Event channel
    pub event_sender: Option<EventSender>,
}

impl EventEmitter for BuildSystemContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl BuildSystemContext {
    /// Execute a command in the build context
    ///
    /// The command runs with a cleared environment replaced by `self.env`
    /// and its output captured. A nonzero exit is reported through
    /// `BuildCommandResult::success`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned.
    pub async fn execute(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<BuildCommandResult> {
        let command_line = format!("{} {}", program.display(), args.join(" "));
        tracing::debug!(command = %command_line, cwd = %working_dir.display(), "executing");
        self.emit_debug_with_context(
            format!("Executing: {command_line}"),
            BTreeMap::from([(
                "working_dir".to_string(),
                working_dir.display().to_string(),
            )]),
        );

        let output = Command::new(program)
            .args(args)
            .env_clear()
            .envs(&self.env)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(BuildCommandResult {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Environment shared by every build command
///
/// Only `PATH` and `HOME` are taken from the caller; locale and timestamps
/// are pinned so repeated runs see identical inputs.
#[must_use]
pub fn build_environment(
    source_date_epoch: u64,
    cc: Option<&str>,
    cxx: Option<&str>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for key in ["PATH", "HOME"] {
        if let Ok(value) = std::env::var(key) {
            env.insert(key.to_string(), value);
        }
    }
    env.insert("LANG".to_string(), "C".to_string());
    env.insert("LC_ALL".to_string(), "C".to_string());
    env.insert(
        "SOURCE_DATE_EPOCH".to_string(),
        source_date_epoch.to_string(),
    );
    if let Some(cc) = cc {
        env.insert("CC".to_string(), cc.to_string());
    }
    if let Some(cxx) = cxx {
        env.insert("CXX".to_string(), cxx.to_string());
    }
    env
}

/// Keep the last `n` lines of `text`
#[must_use]
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_lines() {
        let text = (1..=50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let tail = tail_lines(&text, 3);
        assert_eq!(tail, "48\n49\n50");
        assert_eq!(tail_lines("a\nb", 10), "a\nb");
    }

    #[test]
    fn test_diagnostic_tail_prefers_stderr() {
        let result = BuildCommandResult {
            success: false,
            exit_code: Some(1),
            stdout: "progress".to_string(),
            stderr: "CMake Error: boom".to_string(),
        };
        assert_eq!(result.diagnostic_tail(), "CMake Error: boom");

        let quiet = BuildCommandResult {
            stderr: "  \n".to_string(),
            ..result
        };
        assert_eq!(quiet.diagnostic_tail(), "progress");
    }

    #[test]
    fn test_build_environment_is_pinned() {
        let env = build_environment(315_532_800, Some("gcc-9"), Some("g++-9"));
        assert_eq!(env["LANG"], "C");
        assert_eq!(env["LC_ALL"], "C");
        assert_eq!(env["SOURCE_DATE_EPOCH"], "315532800");
        assert_eq!(env["CC"], "gcc-9");
        assert_eq!(env["CXX"], "g++-9");
        assert!(env
            .keys()
            .all(|k| ["PATH", "HOME", "LANG", "LC_ALL", "SOURCE_DATE_EPOCH", "CC", "CXX"]
                .contains(&k.as_str())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_uses_only_given_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = BTreeMap::new();
        env.insert("ONLY_VAR".to_string(), "1".to_string());
        let ctx = BuildSystemContext {
            source_dir: dir.path().to_path_buf(),
            build_dir: dir.path().to_path_buf(),
            prefix: dir.path().to_path_buf(),
            jobs: 1,
            env,
            event_sender: None,
        };

        let result = ctx
            .execute(Path::new("/usr/bin/env"), &[], dir.path())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "ONLY_VAR=1");
    }
}
