//! Deletion of records left in the pending-delete queue

use crate::api::context::{PostAction, ProcessingContext};
use cpkg_errors::{Error, InstallError, StorageError};
use cpkg_events::{AppEvent, EventEmitter, FailureContext, RestoreEvent};
use cpkg_store::ContentStore;
use cpkg_types::Id;

/// Post action deleting every record still queued once the package is applied
///
/// Failures are reported per record and never stop the remaining deletions.
/// Dropping the restorer without running it discards the queue.
#[derive(Debug, Clone, Default)]
pub struct ContentRestorer {
    pending: Vec<(String, Id)>,
}

impl ContentRestorer {
    #[must_use]
    pub fn new(pending: Vec<(String, Id)>) -> Self {
        Self { pending }
    }

    #[must_use]
    pub fn pending(&self) -> &[(String, Id)] {
        &self.pending
    }

    fn delete(store: &mut dyn ContentStore, database: &str, id: Id) -> Result<(), Error> {
        if !store.has_database(database) {
            return Err(StorageError::DatabaseNotFound {
                database: database.to_string(),
            }
            .into());
        }
        if store.get_record(database, id)?.is_none() {
            return Err(InstallError::RecordNotFound {
                database: database.to_string(),
                id: id.to_string(),
            }
            .into());
        }
        store.delete_record(database, id)?;
        Ok(())
    }
}

impl PostAction for ContentRestorer {
    fn name(&self) -> &'static str {
        "content-restorer"
    }

    fn run(
        self: Box<Self>,
        store: &mut dyn ContentStore,
        context: &mut ProcessingContext,
    ) -> Result<(), Error> {
        let mut deleted = 0;
        let mut failed = 0;

        for (database, id) in self.pending {
            match Self::delete(store, &database, id) {
                Ok(()) => {
                    deleted += 1;
                    tracing::debug!(database = %database, id = %id, "deleted pending record");
                    context.emit(AppEvent::Restore(RestoreEvent::RecordDeleted { database, id }));
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(database = %database, id = %id, error = %e, "error deleting item");
                    context
                        .output
                        .error(format!("Error deleting item: [{database}]: {id}"));
                    context.emit(AppEvent::Restore(RestoreEvent::DeleteFailed {
                        database,
                        id,
                        failure: FailureContext::from_error(&e),
                    }));
                }
            }
        }

        if deleted + failed > 0 {
            tracing::info!(deleted, failed, "pending deletions processed");
            context
                .output
                .info(format!("Removed {deleted} item(s), {failed} failure(s)"));
        }
        context.report.records_deleted += deleted;
        context.report.delete_failures += failed;
        context.emit(AppEvent::Restore(RestoreEvent::Completed { deleted, failed }));
        Ok(())
    }
}
