#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error vocabulary of the cpkg installer
//!
//! One enum per concern: entry keys and payloads ([`PackageError`]), the
//! content store ([`StorageError`]), configuration ([`ConfigError`]) and the
//! install engine itself ([`InstallError`]). They meet in [`Error`], which
//! every public operation returns. All of them are `Clone` because failures
//! are also reported inside events.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod install;
pub mod package;
pub mod storage;

pub use config::ConfigError;
pub use install::InstallError;
pub use package::PackageError;
pub use storage::StorageError;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    /// The run's cancellation token fired; not a failure of the package
    #[error("installation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// I/O failure on a package or destination path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
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

pub type Result<T> = std::result::Result<T, Error>;

/// What an operator sees when an install fails
///
/// Events carry these fields instead of the error itself.
pub trait UserFacingError {
    fn user_message(&self) -> Cow<'_, str>;

    /// How to get the package through on the next attempt
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether running the same install again may succeed unchanged
    fn is_retryable(&self) -> bool {
        false
    }

    /// Dotted code such as `install.scheduling_deadlock`
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Self::Install(err) => err.user_message(),
            Self::Package(err) => err.user_message(),
            Self::Storage(err) => err.user_message(),
            Self::Config(err) => err.user_message(),
            Self::Io {
                message,
                path: Some(path),
                ..
            } => Cow::Owned(format!("{}: {message}", path.display())),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Install(err) => err.user_hint(),
            Self::Package(err) => err.user_hint(),
            Self::Storage(err) => err.user_hint(),
            Self::Config(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Install(err) => err.is_retryable(),
            Self::Storage(err) => err.is_retryable(),
            Self::Io { kind, .. } => !matches!(
                kind,
                std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::InvalidData
            ),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::Install(err) => err.user_code(),
            Self::Package(err) => err.user_code(),
            Self::Storage(err) => err.user_code(),
            Self::Config(err) => err.user_code(),
            Self::Internal(_) => Some("error.internal"),
            Self::Cancelled => Some("error.cancelled"),
            Self::Io { .. } => Some("error.io"),
        }
    }
}
