use cpkg_types::Id;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Pending-delete queue events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RestoreEvent {
    /// A record left in the queue was deleted
    RecordDeleted { database: String, id: Id },

    /// A queued record could not be deleted
    DeleteFailed {
        database: String,
        id: Id,
        failure: FailureContext,
    },

    /// The queue was drained
    Completed { deleted: usize, failed: usize },
}
