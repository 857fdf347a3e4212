use serde::{Deserialize, Serialize};

use cpkg_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod blob;
pub mod files;
pub mod general;
pub mod items;
pub mod package;
pub mod restore;

pub use blob::*;
pub use files::*;
pub use general::*;
pub use items::*;
pub use package::*;
pub use restore::*;

/// Every event the installer emits, tagged by domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Non-fatal entry warnings and swallowed failures
    General(GeneralEvent),

    /// Whole-package installation events
    Package(PackageEvent),

    /// Item phase events (passes, stubs, collisions)
    Items(ItemsEvent),

    /// Blob deduplication and binding events
    Blobs(BlobEvent),

    /// File entry events
    Files(FileEvent),

    /// Pending-delete queue events
    Restore(RestoreEvent),
}

impl AppEvent {
    /// Domain name, as used in the serialized `domain` tag
    #[must_use]
    pub fn domain(&self) -> &'static str {
        match self {
            Self::General(_) => "general",
            Self::Package(_) => "package",
            Self::Items(_) => "items",
            Self::Blobs(_) => "blobs",
            Self::Files(_) => "files",
            Self::Restore(_) => "restore",
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. })
            | Self::Package(PackageEvent::InstallFailed { .. })
            | Self::Restore(RestoreEvent::DeleteFailed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Package(PackageEvent::EntryIgnored { .. })
            | Self::Files(FileEvent::Skipped { .. }) => Level::WARN,

            // Debug-level events (per-record detail)
            Self::Package(PackageEvent::MetadataRead { .. })
            | Self::Items(ItemsEvent::PassCompleted { .. } | ItemsEvent::StubCreated { .. })
            | Self::Blobs(BlobEvent::Deduplicated { .. } | BlobEvent::MediaWritten { .. })
            | Self::Restore(RestoreEvent::RecordDeleted { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "cpkg::events::general",
            Self::Package(_) => "cpkg::events::package",
            Self::Items(_) => "cpkg::events::items",
            Self::Blobs(_) => "cpkg::events::blobs",
            Self::Files(_) => "cpkg::events::files",
            Self::Restore(_) => "cpkg::events::restore",
        }
    }
}
