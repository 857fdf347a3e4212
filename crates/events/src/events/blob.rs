use cpkg_types::Id;
use serde::{Deserialize, Serialize};

/// Blob phase events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobEvent {
    /// An embedded value matched content already stored this run
    Deduplicated { field_id: Id, blob_id: Id },

    /// A media stream was written for a declared file path
    MediaWritten { path: String, blob_id: Id },

    /// Pending blob entries were processed
    Flushed { installed: usize, skipped: usize },
}
