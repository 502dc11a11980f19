#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for formula
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can travel through events.

use std::borrow::Cow;

use formula_types::Stage;
use thiserror::Error;

pub mod config;
pub mod lock;
pub mod network;
pub mod pipeline;
pub mod recipe;

// Re-export all error types at the root
pub use config::ConfigError;
pub use lock::LockError;
pub use network::NetworkError;
pub use pipeline::PipelineError;
pub use recipe::RecipeError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("formula error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    Lock(#[from] LockError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// The pipeline stage this error aborted, if it came from one
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Pipeline(err) => Some(err.stage()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Pipeline(err) => err.user_message(),
            Error::Recipe(err) => err.user_message(),
            Error::Io { message, path, .. } => match path {
                Some(path) => Cow::Owned(format!("{message} ({})", path.display())),
                None => Cow::Owned(message.clone()),
            },
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Pipeline(err) => err.user_hint(),
            Error::Recipe(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Lock(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Pipeline(err) => err.user_code(),
            Error::Recipe(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::Lock(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_pipeline_error() {
        let err: Error = PipelineError::Configure {
            message: "cmake exited with status 1".to_string(),
            exit_code: Some(1),
            output: String::new(),
        }
        .into();
        assert_eq!(err.stage(), Some(Stage::Configure));
        assert_eq!(err.user_code(), Some("pipeline.configure"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_errors_are_final() {
        for err in [
            NetworkError::Timeout {
                url: "https://example.invalid".to_string(),
            },
            NetworkError::ConnectionRefused("example.invalid".to_string()),
            NetworkError::DownloadFailed("reset by peer".to_string()),
        ] {
            let err = Error::from(err);
            assert!(!err.is_retryable());
            assert_eq!(err.stage(), None);
        }
    }

    #[test]
    fn test_io_with_path_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(&io, "/tmp/x");
        assert_eq!(err.stage(), None);
        assert_eq!(err.user_message(), "missing (/tmp/x)");
    }
}
