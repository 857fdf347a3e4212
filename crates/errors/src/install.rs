//! Installation engine error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error(
        "cannot install templates structure: {pending} entries made no progress \
         (cyclic template references or a template below an item created from it)"
    )]
    SchedulingDeadlock { pending: usize },

    #[error("failed to add an item at '{path}': there is no template with id {template_id}")]
    MissingTemplate { path: String, template_id: String },

    #[error(
        "could not create item '{name}' (id {id}, template {template_id}, parent {parent_id}): {message}"
    )]
    RecordCreationFailed {
        name: String,
        id: String,
        template_id: String,
        parent_id: String,
        message: String,
    },

    #[error("could not find target item for '{path}' (db: {database})")]
    ParentNotFound { path: String, database: String },

    #[error("database not found: {database}")]
    UnknownDatabase { database: String },

    #[error("item install mode is undefined")]
    UndefinedItemMode,

    #[error("item merge mode is undefined")]
    UndefinedMergeMode,

    #[error("unsupported version install mode: {mode}")]
    UnsupportedVersionMode { mode: String },

    #[error("could not query the conflict resolver for overwrite options: {message}")]
    ConflictResolutionFailed { message: String },

    #[error("error installing {key}: {message}")]
    EntryFailed { key: String, message: String },

    #[error("invalid embedded blob data in field {field_id}: {message}")]
    InvalidBlobData { field_id: String, message: String },

    #[error("item not found: [{database}] {id}")]
    RecordNotFound { database: String, id: String },

    #[error("file installation failed for {path}: {message}")]
    FileCopyFailed { path: String, message: String },
}

impl InstallError {
    /// Wrap an arbitrary failure with the key of the entry being committed
    pub fn entry_failed(key: impl Into<String>, err: &impl std::fmt::Display) -> Self {
        Self::EntryFailed {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SchedulingDeadlock { .. } => Some(
                "Check the package for templates that inherit from each other or that live below their own instances.",
            ),
            Self::MissingTemplate { .. } => {
                Some("Include the template in the package or install it before this package.")
            }
            Self::UndefinedItemMode | Self::UndefinedMergeMode => {
                Some("Configure a default item install mode and merge mode for collisions.")
            }
            Self::UnknownDatabase { .. } => {
                Some("Make sure the target store exposes every database the package refers to.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FileCopyFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SchedulingDeadlock { .. } => "install.scheduling_deadlock",
            Self::MissingTemplate { .. } => "install.missing_template",
            Self::RecordCreationFailed { .. } => "install.record_creation_failed",
            Self::ParentNotFound { .. } => "install.parent_not_found",
            Self::UnknownDatabase { .. } => "install.unknown_database",
            Self::UndefinedItemMode => "install.undefined_item_mode",
            Self::UndefinedMergeMode => "install.undefined_merge_mode",
            Self::UnsupportedVersionMode { .. } => "install.unsupported_version_mode",
            Self::ConflictResolutionFailed { .. } => "install.conflict_resolution_failed",
            Self::EntryFailed { .. } => "install.entry_failed",
            Self::InvalidBlobData { .. } => "install.invalid_blob_data",
            Self::RecordNotFound { .. } => "install.record_not_found",
            Self::FileCopyFailed { .. } => "install.file_copy_failed",
        };
        Some(code)
    }
}
