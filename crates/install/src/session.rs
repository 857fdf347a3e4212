//! Sink lifecycle and the state a run threads through it

use crate::api::context::ProcessingContext;
use crate::blob::BlobContext;
use cpkg_config::Config;
use cpkg_errors::Error;
use cpkg_events::{EventEmitter, EventSender};
use cpkg_store::ContentStore;
use cpkg_types::PackageEntry;

/// Borrowed run state handed to every sink call
///
/// Holds the target store, the caller's processing context and the blob
/// context that collects blob entries and field references until the item
/// phase has committed every record.
pub struct Session<'a> {
    pub store: &'a mut dyn ContentStore,
    pub context: &'a mut ProcessingContext,
    pub blobs: BlobContext,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a mut dyn ContentStore, context: &'a mut ProcessingContext) -> Self {
        Self {
            store,
            context,
            blobs: BlobContext::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Fail with `Error::Cancelled` once cancellation was requested
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when the run's token has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), Error> {
        self.context.check_cancelled()
    }
}

impl EventEmitter for Session<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.context.event_sender.as_ref()
    }
}

/// Consumer of package entries
///
/// Every entry is `put` first; once the source is exhausted the owner calls
/// `flush` and then `finish`.
pub trait Sink {
    /// Accept one entry
    ///
    /// # Errors
    ///
    /// Returns an error to abort the installation.
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error>;

    /// Apply everything accepted so far
    ///
    /// # Errors
    ///
    /// Returns an error to abort the installation.
    fn flush(&mut self, _session: &mut Session<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Register follow-up work once every sink has flushed
    ///
    /// # Errors
    ///
    /// Returns an error to abort the installation.
    fn finish(&mut self, _session: &mut Session<'_>) -> Result<(), Error> {
        Ok(())
    }
}
