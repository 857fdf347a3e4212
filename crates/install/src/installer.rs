//! Main installer implementation

use crate::api::context::ProcessingContext;
use crate::api::result::InstallReport;
use crate::blob::BlobInstaller;
use crate::dispatch::SinkDispatcher;
use crate::files::FileInstaller;
use crate::items::ItemInstaller;
use crate::metadata::MetadataSink;
use crate::session::{Session, Sink};
use crate::source::{EntrySorter, EntrySource};
use cpkg_errors::Error;
use cpkg_events::{AppEvent, EventEmitter, FailureContext, PackageEvent};
use cpkg_store::ContentStore;
use cpkg_types::EntryKind;

/// Applies content packages to a store
///
/// One call to [`PackageInstaller::install_package`] is one run: sinks and
/// their queues are created for it and dropped with it. Runs against the
/// same store must not overlap.
#[derive(Debug, Clone, Default)]
pub struct PackageInstaller;

impl PackageInstaller {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Dispatcher with the metadata, blob, item and file sinks, flushed in
    /// that order
    #[must_use]
    pub fn create_dispatcher() -> SinkDispatcher {
        let mut dispatcher = SinkDispatcher::new();
        dispatcher.add_sink(EntryKind::Metadata, MetadataSink::new());
        dispatcher.add_sink(EntryKind::Blob, BlobInstaller::new());
        dispatcher.add_sink(EntryKind::Items, ItemInstaller::new());
        dispatcher.add_sink(EntryKind::Files, FileInstaller::new());
        dispatcher
    }

    /// Install every entry of `source` into `store`
    ///
    /// Post actions queued on the context (the content restorer among them)
    /// run after all sinks have finished.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an unreadable source, a scheduling
    /// deadlock, a failed item commit (carrying the entry key), a failing
    /// post action, or `Error::Cancelled` once the context's token fires.
    pub fn install_package(
        &self,
        store: &mut dyn ContentStore,
        source: &mut dyn EntrySource,
        context: &mut ProcessingContext,
    ) -> Result<InstallReport, Error> {
        let source_name = source.name();
        tracing::info!(source = %source_name, "installing package");
        context.emit(AppEvent::Package(PackageEvent::InstallStarting {
            package: source_name,
        }));

        let result = Self::run(store, source, context);
        let package = context.package_name();

        match result {
            Ok(()) => {
                tracing::info!(package = %package, "package installation finished");
                context.emit(AppEvent::Package(PackageEvent::InstallEnded {
                    package: package.clone(),
                    success: true,
                }));
                let mut report = std::mem::take(&mut context.report);
                report.package = package;
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(package = %package, "package installation cancelled");
                } else {
                    tracing::error!(package = %package, error = %e, "package installation failed");
                }
                context.emit(AppEvent::Package(PackageEvent::InstallFailed {
                    package: package.clone(),
                    failure: FailureContext::from_error(&e),
                }));
                context.emit(AppEvent::Package(PackageEvent::InstallEnded {
                    package,
                    success: false,
                }));
                drop(context.take_post_actions());
                context.report = InstallReport::default();
                Err(e)
            }
        }
    }

    fn run(
        store: &mut dyn ContentStore,
        source: &mut dyn EntrySource,
        context: &mut ProcessingContext,
    ) -> Result<(), Error> {
        let mut dispatcher = Self::create_dispatcher();
        {
            let mut session = Session::new(&mut *store, &mut *context);
            let entries = EntrySorter::new(source).populate(&mut dispatcher, &mut session)?;
            tracing::debug!(entries, "package entries dispatched");
            dispatcher.flush(&mut session)?;
            dispatcher.finish(&mut session)?;
        }

        for action in context.take_post_actions() {
            context.check_cancelled()?;
            tracing::debug!(action = action.name(), "running post action");
            action.run(store, context)?;
        }
        Ok(())
    }
}
