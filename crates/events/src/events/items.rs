use cpkg_types::{BehaviourOptions, CollisionKind, Id, ItemUri};
use serde::{Deserialize, Serialize};

/// Item phase events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemsEvent {
    /// The item queue is about to be drained
    Starting { package: String, entries: usize },

    /// One scheduling pass finished
    PassCompleted {
        pass: usize,
        committed: usize,
        postponed: usize,
    },

    /// A stub record was created ahead of its template
    StubCreated {
        database: String,
        id: Id,
        path: String,
    },

    /// A collision was resolved to a set of options
    CollisionResolved {
        kind: CollisionKind,
        database: String,
        id: Id,
        options: BehaviourOptions,
        apply_to_all: bool,
    },

    /// The item phase is over; lists every committed version
    Ended {
        package: String,
        installed: Vec<ItemUri>,
    },
}
