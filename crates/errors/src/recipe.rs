//! Formula loading and validation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RecipeError {
    #[error("failed to read formula {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse formula: {message}")]
    Parse { message: String },

    #[error("required field is empty: {field}")]
    EmptyField { field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("cannot infer archive format for {archive}; set `format` explicitly")]
    UnknownArchiveFormat { archive: String },

    #[error("duplicate archive name: {archive}")]
    DuplicateArchive { archive: String },
}

impl UserFacingError for RecipeError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::EmptyField { .. } => Some(
                "Fill in every required field; `formula digest <file>` prints checksums for archives.",
            ),
            Self::Read { .. } => Some("Check the formula path."),
            Self::Parse { .. } | Self::InvalidField { .. } | Self::UnknownArchiveFormat { .. } => {
                Some("Correct the formula definition before retrying.")
            }
            Self::DuplicateArchive { .. } => {
                Some("Give every resource a distinct `archive` name.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Read { .. } => "recipe.read",
            Self::Parse { .. } => "recipe.parse",
            Self::EmptyField { .. } => "recipe.empty_field",
            Self::InvalidField { .. } => "recipe.invalid_field",
            Self::UnknownArchiveFormat { .. } => "recipe.unknown_archive_format",
            Self::DuplicateArchive { .. } => "recipe.duplicate_archive",
        };
        Some(code)
    }
}
