//! Writing one parsed version into its target record

use crate::blob;
use crate::session::Session;
use chrono::Utc;
use cpkg_errors::{Error, InstallError};
use cpkg_store::{EditTarget, Record};
use cpkg_types::{
    time, Id, ItemDescriptor, ItemReference, ItemUri, Language, VersionInstallMode, VersionNumber,
};
use std::collections::BTreeMap;

/// Version number the incoming version is written to
fn target_version(
    session: &Session<'_>,
    target: &Record,
    reference: &ItemReference,
    descriptor: &ItemDescriptor,
    language: &Language,
    mode: VersionInstallMode,
    remove_other: bool,
) -> Result<VersionNumber, Error> {
    match mode {
        VersionInstallMode::Append if remove_other => Ok(VersionNumber::FIRST),
        VersionInstallMode::Append => {
            let existing = session
                .store
                .version_numbers(&target.database, target.id, language)?;
            Ok(existing
                .last()
                .copied()
                .map_or(VersionNumber::FIRST, VersionNumber::next))
        }
        VersionInstallMode::Merge => Ok(descriptor
            .version
            .and_then(VersionNumber::new)
            .unwrap_or(reference.version)),
        other => Err(InstallError::UnsupportedVersionMode {
            mode: format!("{other:?}"),
        }
        .into()),
    }
}

/// Paste a version into `target` and return its address
///
/// # Errors
///
/// Returns `InstallError::UnsupportedVersionMode` for modes other than
/// `Append` and `Merge`, and propagates blob and store failures.
pub(super) fn paste_version(
    session: &mut Session<'_>,
    target: &Record,
    reference: &ItemReference,
    descriptor: &ItemDescriptor,
    mode: VersionInstallMode,
    remove_other: bool,
) -> Result<ItemUri, Error> {
    let ids = session.context.config.ids.clone();
    let language = Language::parse_or_invariant(descriptor.language.as_deref());
    let version = target_version(
        session,
        target,
        reference,
        descriptor,
        &language,
        mode,
        remove_other,
    )?;
    let uri = ItemUri::new(target.database.clone(), target.id, language, version);

    let mut fields: BTreeMap<Id, String> = descriptor.fields.iter().cloned().collect();
    if let Some(created) = &descriptor.created {
        fields
            .entry(ids.created_field)
            .or_insert_with(|| time::to_iso(created));
    }

    blob::update_blob_data(session, &uri, &mut fields)?;

    if descriptor.template_id == ids.template_field_template {
        let mut sharing = session
            .store
            .begin_edit(EditTarget::record(target.database.clone(), target.id))?;
        for field_id in [ids.shared_field, ids.unversioned_field] {
            let value = fields.get(&field_id).cloned().unwrap_or_default();
            sharing.set_field(field_id, value);
        }
        sharing.read_only_statistics = true;
        session.store.end_edit(sharing)?;
    }

    let mut edit = session.store.begin_edit(EditTarget::version(&uri))?;
    edit.set_name(descriptor.name.clone());
    edit.set_template(descriptor.template_id);
    edit.set_branch(descriptor.branch_id);
    edit.fields = fields;
    edit.read_only_statistics = true;
    edit.save_all = true;
    session.store.end_edit(edit)?;

    let mut mirror = session
        .store
        .begin_edit(EditTarget::record(target.database.clone(), target.id))?;
    mirror.set_name(descriptor.name.clone());
    mirror.set_template(descriptor.template_id);
    mirror.set_branch(descriptor.branch_id);
    mirror.read_only_statistics = true;
    session.store.end_edit(mirror)?;

    clamp_statistics(session, &uri, ids.created_field, ids.updated_field)?;

    if remove_other {
        for other in session
            .store
            .version_numbers(&uri.database, uri.id, &uri.language)?
        {
            if other != version {
                let stale = ItemUri::new(uri.database.clone(), uri.id, uri.language.clone(), other);
                session.store.remove_version(&stale)?;
            }
        }
    }
    Ok(uri)
}

/// Pull `created` / `updated` values that lie in the future back to now
fn clamp_statistics(
    session: &mut Session<'_>,
    uri: &ItemUri,
    created_field: Id,
    updated_field: Id,
) -> Result<(), Error> {
    let now = Utc::now();
    let target = EditTarget::version(uri);
    let mut future = Vec::new();
    for field_id in [created_field, updated_field] {
        let value = session.store.field_value(&target, field_id)?;
        if value
            .as_deref()
            .and_then(time::parse_iso)
            .is_some_and(|timestamp| timestamp > now)
        {
            future.push(field_id);
        }
    }
    if future.is_empty() {
        return Ok(());
    }

    let now = time::to_iso(&now);
    let mut edit = session.store.begin_edit(target)?;
    for field_id in future {
        edit.set_field(field_id, now.clone());
    }
    edit.read_only_statistics = true;
    session.store.end_edit(edit)?;
    Ok(())
}
