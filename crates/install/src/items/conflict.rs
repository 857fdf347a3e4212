//! Collision handling: target lookup, option resolution and structural changes

use super::ItemInstaller;
use crate::api::hooks::{DefaultItemInstallerEvents, ItemInstallerEvents};
use crate::session::Session;
use cpkg_errors::{Error, InstallError, StorageError};
use cpkg_events::{AppEvent, EventEmitter, ItemsEvent};
use cpkg_store::{CreateRecord, EditTarget, Record};
use cpkg_types::reference::paths_equal;
use cpkg_types::{
    BehaviourOptions, CollisionKind, InstallMode, ItemDescriptor, ItemInfo, ItemReference,
    MergeMode, PackageEntry, VersionInstallMode,
};

fn record_info(record: &Record) -> ItemInfo {
    ItemInfo {
        id: record.id,
        name: record.name.clone(),
        path: record.path.clone(),
        template_id: record.template_id,
        database: record.database.clone(),
    }
}

fn incoming_info(reference: &ItemReference, descriptor: &ItemDescriptor) -> ItemInfo {
    ItemInfo {
        id: reference.id,
        name: descriptor.name.clone(),
        path: reference.path.clone(),
        template_id: descriptor.template_id,
        database: reference.database.clone(),
    }
}

impl ItemInstaller {
    /// Existing record an incoming entry collides with
    ///
    /// When the record at the entry's path belongs to the package itself, a
    /// same-named sibling from outside the package is the collision target
    /// instead. The flag is set when no such sibling exists and the path
    /// collision is ignored.
    pub(super) fn target_record(
        &self,
        session: &Session<'_>,
        reference: &ItemReference,
    ) -> Result<(Option<Record>, bool), Error> {
        let database = &reference.database;
        let found = match session.store.get_record(database, reference.id)? {
            Some(record) => Some(record),
            None => session.store.get_record_by_path(database, &reference.path)?,
        };
        let Some(record) = found else {
            return Ok((None, false));
        };
        let Some(parent_id) = record.parent_id else {
            return Ok((Some(record), false));
        };
        if record.id == reference.id || !self.state.in_package(database, record.id) {
            return Ok((Some(record), false));
        }

        let sibling = session
            .store
            .children(database, parent_id)?
            .into_iter()
            .find(|child| {
                child.name == record.name
                    && child.id != record.id
                    && !self.state.in_package(database, child.id)
            });
        match sibling {
            Some(sibling) => Ok((Some(sibling), false)),
            None => Ok((None, true)),
        }
    }

    /// Resolve how the entry's version is written, and whether the other
    /// versions of its language are dropped
    pub(super) fn version_install_mode(
        &mut self,
        session: &mut Session<'_>,
        entry: &PackageEntry,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<(VersionInstallMode, bool), Error> {
        let database = &reference.database;

        if self.state.created.contains(&reference.id) {
            if let (Some(target), _) = self.target_record(session, reference)? {
                self.state.spare(database, target.id);
                self.state.version_mode = VersionInstallMode::Append;
                return Ok((VersionInstallMode::Append, false));
            }
        }

        if self.state.current_id == Some(reference.id) {
            return Ok((self.state.version_mode, false));
        }

        let (target, ignore_path_collision) = self.target_record(session, reference)?;
        let remove_other = if let Some(target) = &target {
            let existing = record_info(target);
            let incoming = incoming_info(reference, descriptor);
            let options = self.resolve_options(session, entry, &existing, &incoming)?;
            self.state.version_mode = options.version_install_mode();
            self.install_item(session, options, Some(target), reference, descriptor)?
        } else {
            let item_mode = if ignore_path_collision {
                InstallMode::SideBySide
            } else {
                InstallMode::Overwrite
            };
            self.state.version_mode = VersionInstallMode::Append;
            self.install_item(
                session,
                BehaviourOptions::new(item_mode, MergeMode::Undefined),
                None,
                reference,
                descriptor,
            )?
        };

        self.state.current_id = Some(reference.id);
        self.state.mark_resolved(database, reference.id);
        if let Some(target) = &target {
            self.state.mark_resolved(database, target.id);
        }
        Ok((self.state.version_mode, remove_other))
    }

    /// Entry properties first, then a cached apply-to-all answer, then the hook
    fn resolve_options(
        &mut self,
        session: &mut Session<'_>,
        entry: &PackageEntry,
        existing: &ItemInfo,
        incoming: &ItemInfo,
    ) -> Result<BehaviourOptions, Error> {
        let kind = CollisionKind::classify(existing.id, incoming.id);
        let from_entry = BehaviourOptions::from_properties(entry.properties(), kind);
        if from_entry.is_defined() {
            return Ok(from_entry);
        }
        if let Some(cached) = self.state.cached_options(kind) {
            return Ok(cached);
        }

        let fallback;
        let events: &dyn ItemInstallerEvents = if let Some(events) = session.context.item_events() {
            events
        } else {
            fallback = DefaultItemInstallerEvents::from_config(&session.context.config.conflicts);
            &fallback
        };
        let (options, apply_to_all) = match events.ask_user(existing, incoming, session.context) {
            Ok(answer) => answer,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                return Err(InstallError::ConflictResolutionFailed {
                    message: e.to_string(),
                }
                .into())
            }
        };

        tracing::debug!(%kind, %options, apply_to_all, id = %incoming.id, "collision resolved");
        self.state.remember_options(kind, options, apply_to_all);
        session.emit(AppEvent::Items(ItemsEvent::CollisionResolved {
            kind,
            database: incoming.database.clone(),
            id: incoming.id,
            options,
            apply_to_all,
        }));
        Ok(options)
    }

    /// Apply the structural part of the chosen options
    ///
    /// Returns whether the existing versions are to be replaced.
    fn install_item(
        &mut self,
        session: &mut Session<'_>,
        options: BehaviourOptions,
        target: Option<&Record>,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<bool, Error> {
        let Some(target) = target else {
            let stub = Self::create_stub(session, reference, descriptor)?;
            self.state.spare(&stub.database, stub.id);
            return Ok(false);
        };
        self.state.spare(&target.database, target.id);

        match options.item_mode {
            InstallMode::Undefined => Err(InstallError::UndefinedItemMode.into()),
            InstallMode::Overwrite
                if target.id == reference.id
                    || target.template_id == session.context.config.ids.language_template =>
            {
                self.overwrite_in_place(session, target, reference, descriptor)?;
                Ok(true)
            }
            InstallMode::Overwrite => {
                tracing::debug!(path = %target.path, id = %target.id, "replacing colliding record");
                session.store.delete_record(&target.database, target.id)?;
                Self::create_stub(session, reference, descriptor)?;
                Ok(false)
            }
            InstallMode::Merge => match options.merge_mode {
                MergeMode::Undefined => Err(InstallError::UndefinedMergeMode.into()),
                MergeMode::Clear => Ok(true),
                MergeMode::Append | MergeMode::Merge => Ok(false),
            },
            InstallMode::SideBySide => {
                Self::create_stub(session, reference, descriptor)?;
                Ok(false)
            }
            InstallMode::Skip => Ok(false),
        }
    }

    /// Move the record into place, queue its children for deletion and
    /// replace its definition
    fn overwrite_in_place(
        &mut self,
        session: &mut Session<'_>,
        target: &Record,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<(), Error> {
        let database = &target.database;
        if !paths_equal(&reference.path, &target.path) {
            let parent_path = reference.parent_path().ok_or_else(|| InstallError::ParentNotFound {
                path: reference.path.clone(),
                database: database.clone(),
            })?;
            let parent = session.store.ensure_path(database, parent_path)?;
            tracing::debug!(from = %target.path, to = %reference.path, "moving record");
            session.store.move_record(database, target.id, parent.id)?;
        }

        for child in session.store.children(database, target.id)? {
            if self.state.enqueue_delete(database, child.id) {
                tracing::debug!(path = %child.path, id = %child.id, "queued for deletion");
            }
        }

        let mut edit = session
            .store
            .begin_edit(EditTarget::record(database.clone(), target.id))?;
        edit.set_name(descriptor.name.clone());
        edit.set_template(descriptor.template_id);
        edit.set_branch(descriptor.branch_id);
        edit.read_only_statistics = true;
        session.store.end_edit(edit)?;
        Ok(())
    }

    /// Create a record with name, template and parent only
    pub(super) fn create_stub(
        session: &mut Session<'_>,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
    ) -> Result<Record, Error> {
        let database = &reference.database;
        if !session.store.has_database(database) {
            return Err(InstallError::UnknownDatabase {
                database: database.clone(),
            }
            .into());
        }

        let by_id = match descriptor.parent_id {
            Some(parent_id) => session.store.get_record(database, parent_id)?,
            None => None,
        };
        let parent = match (by_id, reference.parent_path()) {
            (Some(parent), _) => parent,
            (None, Some(parent_path)) => session.store.ensure_path(database, parent_path)?,
            (None, None) => {
                return Err(InstallError::ParentNotFound {
                    path: reference.path.clone(),
                    database: database.clone(),
                }
                .into())
            }
        };

        let name = if descriptor.name.is_empty() {
            reference.name().to_string()
        } else {
            descriptor.name.clone()
        };
        let request = CreateRecord {
            parent_id: Some(parent.id),
            name: name.clone(),
            template_id: descriptor.template_id,
            id: reference.id,
            created: descriptor.created,
        };

        let record = match session.store.create_record(database, request) {
            Ok(record) => record,
            Err(e) => {
                return Err(Self::creation_error(
                    session, reference, descriptor, &parent, name, &e,
                ))
            }
        };
        session.store.remove_version_data(database, record.id, true)?;

        tracing::debug!(path = %record.path, id = %record.id, "created stub record");
        session.context.report.stubs_created += 1;
        session.emit(AppEvent::Items(ItemsEvent::StubCreated {
            database: database.clone(),
            id: record.id,
            path: record.path.clone(),
        }));
        Ok(record)
    }

    fn creation_error(
        session: &Session<'_>,
        reference: &ItemReference,
        descriptor: &ItemDescriptor,
        parent: &Record,
        name: String,
        error: &StorageError,
    ) -> Error {
        let template_exists = matches!(
            session.store.get_record(&reference.database, descriptor.template_id),
            Ok(Some(_))
        );
        if template_exists {
            InstallError::RecordCreationFailed {
                name,
                id: reference.id.to_string(),
                template_id: descriptor.template_id.to_string(),
                parent_id: parent.id.to_string(),
                message: error.to_string(),
            }
            .into()
        } else {
            InstallError::MissingTemplate {
                path: reference.path.clone(),
                template_id: descriptor.template_id.to_string(),
            }
            .into()
        }
    }
}
