//! Package entry error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PackageError {
    #[error("cannot parse entry key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("invalid payload for entry '{key}': {message}")]
    InvalidPayload { key: String, message: String },

    #[error("entry '{key}' has no payload")]
    MissingPayload { key: String },

    #[error("invalid identifier: {value}")]
    InvalidId { value: String },

    #[error("invalid version number: {value}")]
    InvalidVersion { value: String },

    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MalformedKey { .. } | Self::InvalidPayload { .. } | Self::MissingPayload { .. } => {
                Some("The package is damaged or was produced by an incompatible exporter.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MalformedKey { .. } => "package.malformed_key",
            Self::InvalidPayload { .. } => "package.invalid_payload",
            Self::MissingPayload { .. } => "package.missing_payload",
            Self::InvalidId { .. } => "package.invalid_id",
            Self::InvalidVersion { .. } => "package.invalid_version",
            Self::InvalidTimestamp { .. } => "package.invalid_timestamp",
        };
        Some(code)
    }
}
