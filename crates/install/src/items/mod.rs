//! Item installer
//!
//! Item entries are queued on `put` and installed on `flush` in one or more
//! passes. An entry whose template (or a base template) is still waiting in
//! the queue is postponed to the next pass, with a stub record created so
//! that entries below it can resolve their parent. A pass in which nothing
//! progresses means the templates reference each other and fails the run.

mod conflict;
mod restore;
mod state;
mod version;

pub use restore::ContentRestorer;

use crate::blob;
use crate::session::{Session, Sink};
use cpkg_errors::{Error, InstallError};
use cpkg_events::{AppEvent, EventEmitter, ItemsEvent};
use cpkg_store::Record;
use cpkg_types::{ItemDescriptor, ItemReference, PackageEntry, VersionInstallMode};
use state::{QueuedEntry, RunState};

/// Sink for `items/*` entries
#[derive(Debug, Default)]
pub struct ItemInstaller {
    state: RunState,
}

impl ItemInstaller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries waiting for the next flush
    #[must_use]
    pub fn queued(&self) -> usize {
        self.state.queue.len()
    }

    /// Records currently queued for deletion
    #[must_use]
    pub fn pending_deletes(&self) -> usize {
        self.state.pending_delete.len()
    }

    fn run_passes(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        let mut pass = 0;
        loop {
            session.check_cancelled()?;
            pass += 1;
            self.state.postponed.clear();
            let queue = std::mem::take(&mut self.state.queue);
            let count = queue.len();

            for queued in queue {
                self.install_entry(session, queued)?;
            }

            let postponed = self.state.postponed.len();
            tracing::debug!(pass, committed = count - postponed, postponed, "item pass finished");
            session.emit(AppEvent::Items(ItemsEvent::PassCompleted {
                pass,
                committed: count - postponed,
                postponed,
            }));

            if postponed == 0 {
                return Ok(());
            }
            if postponed == count {
                tracing::error!(pending = count, "no item entry could be installed in a full pass");
                return Err(InstallError::SchedulingDeadlock { pending: count }.into());
            }
            self.state.queue = std::mem::take(&mut self.state.postponed);
        }
    }

    fn install_entry(&mut self, session: &mut Session<'_>, mut queued: QueuedEntry) -> Result<(), Error> {
        session.check_cancelled()?;
        let descriptor = match queued.descriptor.take() {
            Some(descriptor) => descriptor,
            None => {
                let bytes = queued.entry.read_bytes()?;
                ItemDescriptor::parse(queued.entry.key(), &bytes, queued.reference.template_id)?
            }
        };
        let reference = &queued.reference;

        if self
            .state
            .is_blocked(&reference.database, reference.id, &descriptor)
        {
            if let Err(e) = self.stub_blocked(session, reference, &descriptor) {
                return Err(Self::entry_error(queued.entry.key(), e));
            }
            tracing::debug!(key = queued.entry.key(), "template not installed yet, postponing");
            queued.descriptor = Some(descriptor);
            self.state.postponed.push(queued);
            return Ok(());
        }

        if let Err(e) = self.commit_entry(session, &queued.entry, reference, &descriptor) {
            return Err(Self::entry_error(queued.entry.key(), e));
        }
        self.state.commit(&reference.database, reference.id);
        Ok(())
    }

    /// Blocked entries still reserve their id with a stub so later entries
    /// can resolve them as parents
    fn stub_blocked(
        &mut self,
        session: &mut Session<'_>,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<(), Error> {
        let (target, _) = self.target_record(session, reference)?;
        if target.is_none() {
            Self::create_stub(session, reference, descriptor)?;
            self.state.created.insert(reference.id);
        }
        Ok(())
    }

    fn entry_error(key: &str, error: Error) -> Error {
        if error.is_cancelled() {
            tracing::info!(key, "installation was aborted at entry");
            return Error::Cancelled;
        }
        tracing::error!(key, error = %error, "error installing entry");
        InstallError::entry_failed(key, &error).into()
    }

    fn commit_entry(
        &mut self,
        session: &mut Session<'_>,
        entry: &PackageEntry,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<(), Error> {
        let (mode, remove_other) =
            self.version_install_mode(session, entry, reference, descriptor)?;
        match mode {
            VersionInstallMode::Skip => {}
            VersionInstallMode::Undefined => {
                tracing::info!(key = entry.key(), "version install mode is not defined for entry");
                session.emit_entry_warning(entry.key(), "version install mode is not defined");
            }
            VersionInstallMode::Append | VersionInstallMode::Merge => {
                tracing::info!(key = entry.key(), "installing item");
                let target = Self::commit_target(session, reference)?;
                let uri = version::paste_version(
                    session,
                    &target,
                    reference,
                    descriptor,
                    mode,
                    remove_other,
                )?;
                self.state.installed.push(uri);
            }
        }
        Ok(())
    }

    /// Record the version is written into: by id, then by path
    fn commit_target(session: &Session<'_>, reference: &ItemReference) -> Result<Record, Error> {
        if let Some(record) = session.store.get_record(&reference.database, reference.id)? {
            return Ok(record);
        }
        session
            .store
            .get_record_by_path(&reference.database, &reference.path)?
            .ok_or_else(|| {
                InstallError::RecordNotFound {
                    database: reference.database.clone(),
                    id: reference.id.to_string(),
                }
                .into()
            })
    }

    fn finish_items_phase(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        self.state.reset_pass_state();
        let installed = std::mem::take(&mut self.state.installed);
        let package = session.context.package_name();
        tracing::info!(package = %package, installed = installed.len(), "items phase ended");
        session.context.report.add_installed(installed.iter().cloned());
        session.emit(AppEvent::Items(ItemsEvent::Ended { package, installed }));
        blob::flush_data(session)
    }
}

impl Sink for ItemInstaller {
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error> {
        let reference = match ItemReference::parse_key(entry.key()) {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(key = entry.key(), error = %e, "invalid entry key encountered during installation");
                session.emit_entry_warning(entry.key(), e.to_string());
                return Ok(());
            }
        };
        self.state.declare(&reference.database, reference.id);
        self.state.queue.push(QueuedEntry {
            entry,
            reference,
            descriptor: None,
        });
        Ok(())
    }

    fn flush(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        if self.state.queue.is_empty() {
            return Ok(());
        }
        let entries = self.state.queue.len();
        let package = session.context.package_name();
        tracing::info!(package = %package, entries, "installing items");
        session.emit(AppEvent::Items(ItemsEvent::Starting { package, entries }));

        let result = self.run_passes(session);
        let cleanup = self.finish_items_phase(session);
        match (result, cleanup) {
            (Err(e), Err(blob_error)) => {
                tracing::error!(error = %blob_error, "blob flush failed after item failure");
                session.emit_error(format!("blob flush failed after item failure: {blob_error}"));
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn finish(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        let pending = std::mem::take(&mut self.state.pending_delete);
        session.context.add_post_action(ContentRestorer::new(pending));
        Ok(())
    }
}
