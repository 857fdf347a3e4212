use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File entry events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileEvent {
    /// A file was written below the files root
    Installed { path: PathBuf, bytes: u64 },

    /// A file entry was not written
    Skipped { key: String, reason: String },
}
