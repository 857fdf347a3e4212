//! Blob installer
//!
//! Binary field data is handled in two steps. While versions are pasted,
//! [`update_blob_data`] inspects their fields: embedded attachments are
//! decoded, deduplicated by content hash and stored right away, short
//! attachment values naming an existing blob are remembered as links, and
//! file path fields are remembered as file references. Blob entries of the
//! package are only collected by the sink; [`flush_data`] applies them once
//! the item phase has committed every record they may bind to.

use crate::session::{Session, Sink};
use base64::Engine as _;
use cpkg_errors::{Error, InstallError};
use cpkg_events::{AppEvent, BlobEvent, EventEmitter};
use cpkg_hash::{path_blob_id, Hash};
use cpkg_store::EditTarget;
use cpkg_types::{BlobKey, Id, ItemUri, PackageEntry};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

/// Field value referring to a blob stored by a `blob/<database>/<id>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLink {
    pub database: String,
    pub id: Id,
}

/// File path field waiting for its media stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub uri: ItemUri,
    pub field_id: Id,
    pub declared_path: String,
}

/// Blob state of one run
#[derive(Debug, Default)]
pub struct BlobContext {
    entries: Vec<PackageEntry>,
    links: Vec<BlobLink>,
    file_references: Vec<FileReference>,
    content_hashes: HashMap<Hash, Id>,
}

impl BlobContext {
    #[must_use]
    pub fn pending_entries(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn links(&self) -> &[BlobLink] {
        &self.links
    }

    #[must_use]
    pub fn file_references(&self) -> &[FileReference] {
        &self.file_references
    }

    fn has_link(&self, database: &str, id: Id) -> bool {
        self.links
            .iter()
            .any(|link| link.database == database && link.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.links.clear();
        self.file_references.clear();
        self.content_hashes.clear();
    }
}

/// Sink collecting `blob/*` entries; they are applied by [`flush_data`]
#[derive(Debug, Default)]
pub struct BlobInstaller;

impl BlobInstaller {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sink for BlobInstaller {
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error> {
        session.blobs.entries.push(entry);
        Ok(())
    }
}

/// Post-process the fields of a version about to be committed
///
/// Attachment values are rewritten in place to the id of the stored blob.
///
/// # Errors
///
/// Returns `InstallError::InvalidBlobData` when an embedded attachment is
/// not valid base64, or a storage error when the blob cannot be written.
pub fn update_blob_data(
    session: &mut Session<'_>,
    uri: &ItemUri,
    fields: &mut BTreeMap<Id, String>,
) -> Result<(), Error> {
    let field_config = session.context.config.fields.clone();

    for (field_id, value) in fields.iter_mut() {
        if value.is_empty() {
            continue;
        }
        let Some(definition) = session.store.field_definition(&uri.database, *field_id) else {
            continue;
        };

        if definition.type_label == field_config.file_path_type
            && definition
                .name
                .eq_ignore_ascii_case(&field_config.file_path_name)
        {
            session.blobs.file_references.push(FileReference {
                uri: uri.clone(),
                field_id: *field_id,
                declared_path: value.clone(),
            });
        }

        if !definition
            .type_key
            .eq_ignore_ascii_case(&field_config.attachment_type)
        {
            continue;
        }

        if value.len() < field_config.blob_link_max_len {
            if let Some(id) = Id::try_parse(value) {
                session.blobs.links.push(BlobLink {
                    database: uri.database.clone(),
                    id,
                });
                continue;
            }
        }

        let data = base64::engine::general_purpose::STANDARD
            .decode(value.trim())
            .map_err(|e| InstallError::InvalidBlobData {
                field_id: field_id.to_string(),
                message: e.to_string(),
            })?;
        let hash = Hash::from_data(&data);

        let blob_id = if let Some(existing) = session.blobs.content_hashes.get(&hash) {
            let existing = *existing;
            tracing::debug!(field = %field_id, blob = %existing, hash = %hash, "reusing stored blob");
            session.emit(AppEvent::Blobs(BlobEvent::Deduplicated {
                field_id: *field_id,
                blob_id: existing,
            }));
            existing
        } else {
            let blob_id = Id::new_random();
            session
                .store
                .set_blob(&uri.database, blob_id, &mut Cursor::new(data))?;
            tracing::debug!(field = %field_id, blob = %blob_id, hash = %hash, "stored embedded blob");
            session.blobs.content_hashes.insert(hash, blob_id);
            blob_id
        };
        *value = blob_id.to_string();
    }
    Ok(())
}

/// Apply the collected blob entries and reset the blob context
///
/// The context is cleared whether or not applying succeeds.
///
/// # Errors
///
/// Returns an error when reading an entry or writing to the store fails, or
/// when the run is cancelled.
pub fn flush_data(session: &mut Session<'_>) -> Result<(), Error> {
    if session.blobs.entries.is_empty() {
        session.blobs.clear();
        return Ok(());
    }
    let entries = std::mem::take(&mut session.blobs.entries);
    let mut installed = 0;
    let mut skipped = 0;

    let result = install_entries(session, &entries, &mut installed, &mut skipped);
    session.blobs.clear();
    result?;

    tracing::info!(
        installed,
        skipped,
        "installing of blob values has been finished"
    );
    session.context.report.blobs_installed += installed;
    session.context.report.blobs_skipped += skipped;
    session.emit(AppEvent::Blobs(BlobEvent::Flushed { installed, skipped }));
    Ok(())
}

fn install_entries(
    session: &mut Session<'_>,
    entries: &[PackageEntry],
    installed: &mut usize,
    skipped: &mut usize,
) -> Result<(), Error> {
    for entry in entries {
        session.check_cancelled()?;
        if install_entry(session, entry)? {
            *installed += 1;
        } else {
            *skipped += 1;
        }
    }
    Ok(())
}

fn install_entry(session: &mut Session<'_>, entry: &PackageEntry) -> Result<bool, Error> {
    let key = match BlobKey::parse(entry.key()) {
        Ok(key) => key,
        Err(e) => {
            tracing::error!(key = entry.key(), error = %e, "cannot parse entry key");
            session.emit_entry_warning(entry.key(), e.to_string());
            return Ok(false);
        }
    };

    if key.area == session.context.config.blobs.media_marker {
        return install_file(session, entry, key.id);
    }

    if !session.store.has_database(&key.area) {
        tracing::error!(database = %key.area, "cannot find database");
        session.emit_entry_warning(entry.key(), format!("unknown database {}", key.area));
        return Ok(false);
    }
    if !session.blobs.has_link(&key.area, key.id) {
        tracing::debug!(key = entry.key(), "blob is not referenced by any field");
        return Ok(false);
    }
    let mut reader = entry.open()?;
    session.store.set_blob(&key.area, key.id, &mut reader)?;
    Ok(true)
}

/// Bind a media stream to every file reference whose declared path maps to `blob_id`
///
/// The first match writes the media; later matches point at the same path.
fn install_file(
    session: &mut Session<'_>,
    entry: &PackageEntry,
    blob_id: Id,
) -> Result<bool, Error> {
    let mut stored_path: Option<String> = None;
    let mut index = session.blobs.file_references.len();

    while index > 0 {
        index -= 1;
        if path_blob_id(&session.blobs.file_references[index].declared_path) != blob_id {
            continue;
        }
        let reference = session.blobs.file_references.remove(index);

        if let Some(path) = &stored_path {
            let mut edit = session.store.begin_edit(EditTarget::version(&reference.uri))?;
            edit.set_field(reference.field_id, path.clone());
            session.store.end_edit(edit)?;
            continue;
        }

        let mut reader = entry.open()?;
        if let Some(path) =
            session
                .store
                .write_media(&reference.uri, reference.field_id, &mut reader)?
        {
            tracing::debug!(uri = %reference.uri, path = %path, "wrote media stream");
            session.emit(AppEvent::Blobs(BlobEvent::MediaWritten {
                path: path.clone(),
                blob_id,
            }));
            stored_path = Some(path);
        }
    }
    Ok(stored_path.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::ProcessingContext;
    use cpkg_store::{ContentStore, FieldDefinition, MemoryStore};
    use cpkg_types::{Language, VersionNumber};

    fn attachment() -> FieldDefinition {
        FieldDefinition {
            name: "Blob".to_string(),
            type_label: "Attachment".to_string(),
            type_key: "attachment".to_string(),
        }
    }

    #[test]
    fn test_identical_attachments_share_one_blob() {
        let (f1, f2) = (Id::new_random(), Id::new_random());
        let mut store = MemoryStore::new()
            .with_database("master")
            .with_field(f1, attachment())
            .with_field(f2, attachment());
        let record = store.ensure_path("master", "/media/a").unwrap();
        let uri = ItemUri::new("master", record.id, Language::Invariant, VersionNumber::FIRST);
        let encoded = base64::engine::general_purpose::STANDARD.encode([1u8; 64]);

        let mut context = ProcessingContext::new();
        let mut session = Session::new(&mut store, &mut context);
        let mut fields = BTreeMap::from([(f1, encoded.clone()), (f2, encoded)]);
        update_blob_data(&mut session, &uri, &mut fields).unwrap();
        drop(session);

        assert_eq!(fields[&f1], fields[&f2]);
        assert_eq!(store.blob_count("master"), 1);
    }

    #[test]
    fn test_short_id_value_is_a_link() {
        let field = Id::new_random();
        let mut store = MemoryStore::new()
            .with_database("master")
            .with_field(field, attachment());
        let linked = Id::new_random();
        let uri = ItemUri::new("master", Id::new_random(), Language::Invariant, VersionNumber::FIRST);

        let mut context = ProcessingContext::new();
        let mut session = Session::new(&mut store, &mut context);
        let mut fields = BTreeMap::from([(field, linked.to_string())]);
        update_blob_data(&mut session, &uri, &mut fields).unwrap();
        assert!(session.blobs.has_link("master", linked));
        assert_eq!(fields[&field], linked.to_string());
    }

    #[test]
    fn test_flush_without_entries_clears_references() {
        let field = Id::new_random();
        let mut store = MemoryStore::new()
            .with_database("master")
            .with_field(field, attachment());
        let uri = ItemUri::new("master", Id::new_random(), Language::Invariant, VersionNumber::FIRST);

        let mut context = ProcessingContext::new();
        let mut session = Session::new(&mut store, &mut context);
        let mut fields = BTreeMap::from([(field, Id::new_random().to_string())]);
        update_blob_data(&mut session, &uri, &mut fields).unwrap();
        assert_eq!(session.blobs.links().len(), 1);

        flush_data(&mut session).unwrap();
        assert!(session.blobs.links().is_empty());
        assert!(session.blobs.file_references().is_empty());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let field = Id::new_random();
        let mut store = MemoryStore::new()
            .with_database("master")
            .with_field(field, attachment());
        let uri = ItemUri::new("master", Id::new_random(), Language::Invariant, VersionNumber::FIRST);

        let mut context = ProcessingContext::new();
        let mut session = Session::new(&mut store, &mut context);
        let mut fields = BTreeMap::from([(field, "%%% not base64 but long enough to skip links %%%".to_string())]);
        let err = update_blob_data(&mut session, &uri, &mut fields).unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::InvalidBlobData { .. })
        ));
    }

    #[test]
    fn test_unreferenced_and_malformed_entries_are_skipped() {
        let mut store = MemoryStore::new().with_database("master");
        let mut context = ProcessingContext::new();
        {
            let mut session = Session::new(&mut store, &mut context);
            let mut sink = BlobInstaller::new();
            sink.put(
                &mut session,
                PackageEntry::new(format!("blob/master/{}", Id::new_random()))
                    .with_bytes(b"x".to_vec()),
            )
            .unwrap();
            sink.put(&mut session, PackageEntry::new("blob/master/not-a-guid"))
                .unwrap();
            sink.put(
                &mut session,
                PackageEntry::new(format!("blob/web/{}", Id::new_random())),
            )
            .unwrap();
            flush_data(&mut session).unwrap();
            assert_eq!(session.blobs.pending_entries(), 0);
        }
        assert_eq!(context.report.blobs_installed, 0);
        assert_eq!(context.report.blobs_skipped, 3);
        assert_eq!(store.blob_count("master"), 0);
    }
}
