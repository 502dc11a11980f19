//! CLI error handling

use std::fmt;

use formula_errors::{Error, UserFacingError};
use formula_types::Stage;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Error from the library crates
    Ops(Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error while writing output
    Io(std::io::Error),
}

impl CliError {
    /// Process exit status for this error
    ///
    /// Stage failures get a code per stage so scripts can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Ops(e) => match e {
                Error::Pipeline(p) => stage_exit_code(p.stage()),
                Error::Recipe(_) | Error::Config(_) => 2,
                Error::Lock(_) => 3,
                _ => 1,
            },
            CliError::InvalidArguments(_) => 2,
            CliError::Io(_) => 1,
        }
    }
}

fn stage_exit_code(stage: Stage) -> i32 {
    match stage {
        Stage::Fetch => 10,
        Stage::Integrity => 11,
        Stage::Unpack => 12,
        Stage::Configure => 13,
        Stage::Build => 14,
        Stage::Install => 15,
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                // Stage failures already lead with `[stage]`
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_errors::{LockError, NetworkError, PipelineError, RecipeError};

    #[test]
    fn test_exit_codes() {
        let fetch: CliError = Error::from(PipelineError::Fetch {
            url: String::new(),
            message: "URL is empty".to_string(),
        })
        .into();
        assert_eq!(fetch.exit_code(), 10);

        let install: CliError = Error::from(PipelineError::Install {
            artifact: "wsi2dcm".to_string(),
            message: "not found".to_string(),
        })
        .into();
        assert_eq!(install.exit_code(), 15);

        let recipe: CliError = Error::from(RecipeError::EmptyField {
            field: "metadata.version".to_string(),
        })
        .into();
        assert_eq!(recipe.exit_code(), 2);

        let lock: CliError = Error::from(LockError::ContentionUnknown {
            lock_path: "/usr/local/.locks/wsi2dcm.lock".into(),
        })
        .into();
        assert_eq!(lock.exit_code(), 3);

        assert_eq!(CliError::from(Error::internal("boom")).exit_code(), 1);
    }

    #[test]
    fn test_display_names_stage() {
        let err: CliError = Error::from(PipelineError::Configure {
            message: "cmake exited with status 1".to_string(),
            exit_code: Some(1),
            output: "CMake Error".to_string(),
        })
        .into();
        let text = err.to_string();
        assert!(text.starts_with("[configure] configure failed: cmake exited with status 1"));
        assert_eq!(text.matches("[configure]").count(), 1);
        assert!(!text.contains("stage failed"));
        assert!(text.contains("Code: pipeline.configure"));
    }

    #[test]
    fn test_network_failure_not_offered_as_retry() {
        let err: CliError = Error::from(NetworkError::Timeout {
            url: "https://example.invalid/a.tar.gz".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), 1);
        assert!(!err.to_string().contains("Retry"));
    }
}
