use serde::{Deserialize, Serialize};

use formula_errors::UserFacingError;

/// What went wrong, in the shape the CLI prints and `--json` emits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// e.g. `pipeline.fetch`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    /// Snapshot a user-facing error so it can travel through the channel
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(str::to_string),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}

pub mod download;
pub mod general;
pub mod pipeline;

pub use download::*;
pub use general::*;
pub use pipeline::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, debug output)
    General(GeneralEvent),

    /// Install pipeline lifecycle
    Pipeline(PipelineEvent),

    /// Archive downloads
    Download(DownloadEvent),
}
