//! Content store error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("database not found: {database}")]
    DatabaseNotFound { database: String },

    #[error("record not found: [{database}] {id}")]
    RecordNotFound { database: String, id: String },

    #[error("record already exists: [{database}] {id}")]
    DuplicateRecord { database: String, id: String },

    #[error("parent not found: [{database}] {id}")]
    ParentNotFound { database: String, id: String },

    #[error("invalid move of [{database}] {id}: {reason}")]
    InvalidMove {
        database: String,
        id: String,
        reason: String,
    },

    #[error("blob not found: [{database}] {id}")]
    BlobNotFound { database: String, id: String },

    #[error("edit rejected for [{database}] {id}: {reason}")]
    EditRejected {
        database: String,
        id: String,
        reason: String,
    },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("corrupted data: {message}")]
    CorruptedData { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        // Without a known path, avoid inventing placeholders; preserve message only
        Self::IoError {
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Convert an `io::Error` into a `StorageError` with an associated path
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::NotFound => Self::PathNotFound {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.display().to_string(),
            },
            _ => Self::IoError {
                message: format!("{}: {}", path.display(), err),
            },
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseNotFound { .. } => {
                Some("Check that the target store exposes the database named by the package.")
            }
            Self::PermissionDenied { .. } => {
                Some("Adjust filesystem permissions or retry with elevated privileges.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::IoError { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DatabaseNotFound { .. } => "storage.database_not_found",
            Self::RecordNotFound { .. } => "storage.record_not_found",
            Self::DuplicateRecord { .. } => "storage.duplicate_record",
            Self::ParentNotFound { .. } => "storage.parent_not_found",
            Self::InvalidMove { .. } => "storage.invalid_move",
            Self::BlobNotFound { .. } => "storage.blob_not_found",
            Self::EditRejected { .. } => "storage.edit_rejected",
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::PathNotFound { .. } => "storage.path_not_found",
            Self::AlreadyExists { .. } => "storage.already_exists",
            Self::InvalidPath { .. } => "storage.invalid_path",
            Self::CorruptedData { .. } => "storage.corrupted_data",
            Self::IoError { .. } => "storage.io_error",
        };
        Some(code)
    }
}
