use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Whole-package installation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    /// Installation of a package is about to start
    InstallStarting { package: String },

    /// A `metadata/*` entry was read
    MetadataRead { name: String },

    /// An entry with an unknown key prefix was dropped
    EntryIgnored { key: String },

    /// Installation finished, successfully or not
    InstallEnded { package: String, success: bool },

    /// Installation failed
    InstallFailed {
        package: String,
        failure: FailureContext,
    },
}
