//! Run lock error types

use std::borrow::Cow;
use std::path::PathBuf;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error(
        "another run holds {lock_path}: {command} (PID {pid}, started at unix time {started_at_unix})"
    )]
    Contention {
        command: String,
        pid: u32,
        started_at_unix: u64,
        lock_path: PathBuf,
    },

    #[error("another run holds {lock_path} (lock metadata unreadable)")]
    ContentionUnknown { lock_path: PathBuf },

    #[error("failed to acquire {lock_path}: {message}")]
    Failed { lock_path: PathBuf, message: String },
}

impl UserFacingError for LockError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Contention { .. } | Self::ContentionUnknown { .. } => Some(
                "Wait for the other run to finish. If no formula process is running, remove the lock file.",
            ),
            Self::Failed { .. } => Some("Ensure the install prefix is writable."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Contention { .. } | Self::ContentionUnknown { .. } => "lock.contention",
            Self::Failed { .. } => "lock.failed",
        };
        Some(code)
    }
}
