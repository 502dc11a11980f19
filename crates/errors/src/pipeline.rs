//! Install pipeline stage errors
//!
//! Every variant aborts the whole run. None of them is retryable: network
//! flakiness and tool hiccups are surfaced verbatim to the caller.

use std::borrow::Cow;

use crate::UserFacingError;
use formula_types::Stage;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("fetch failed for {url:?}: {message}")]
    Fetch { url: String, message: String },

    #[error("integrity check failed for {archive}: expected {algorithm} {expected}, got {actual}")]
    Integrity {
        archive: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("unpack failed for {archive}: {message}")]
    Unpack { archive: String, message: String },

    #[error("configure failed: {message}")]
    Configure {
        message: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("build failed: {message}")]
    Build {
        message: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("install failed for {artifact}: {message}")]
    Install { artifact: String, message: String },
}

impl PipelineError {
    /// Stage that produced this error
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { .. } => Stage::Fetch,
            Self::Integrity { .. } => Stage::Integrity,
            Self::Unpack { .. } => Stage::Unpack,
            Self::Configure { .. } => Stage::Configure,
            Self::Build { .. } => Stage::Build,
            Self::Install { .. } => Stage::Install,
        }
    }

    /// Diagnostic output captured from the failing external tool
    #[must_use]
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::Configure { output, .. } | Self::Build { output, .. } if !output.is_empty() => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}

impl UserFacingError for PipelineError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(format!("[{}] {self}", self.stage()))
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Fetch { .. } => Some("Check the URL in the formula and your network access."),
            Self::Integrity { .. } => Some(
                "The archive does not match the formula checksum. Do not bypass this; verify the source.",
            ),
            Self::Unpack { .. } => {
                Some("Check that the declared archive format matches the downloaded file.")
            }
            Self::Configure { .. } => {
                Some("Inspect the configure output above; a build dependency may be missing.")
            }
            Self::Build { .. } => Some("Inspect the compiler output above."),
            Self::Install { .. } => Some(
                "The build did not produce the declared artifact. Check the formula install list.",
            ),
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Fetch { .. } => "pipeline.fetch",
            Self::Integrity { .. } => "pipeline.integrity",
            Self::Unpack { .. } => "pipeline.unpack",
            Self::Configure { .. } => "pipeline.configure",
            Self::Build { .. } => "pipeline.build",
            Self::Install { .. } => "pipeline.install",
        };
        Some(code)
    }
}
