#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Record store interface for cpkg
//!
//! The installer never talks to a concrete database. It drives a
//! [`ContentStore`], which exposes the hierarchical record tree, versioned
//! field data, raw blobs and media streams through a small set of
//! edit/versioning primitives. [`MemoryStore`] is the in-process reference
//! implementation.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use cpkg_errors::StorageError;
use cpkg_types::{Id, ItemUri, Language, VersionNumber};
use std::collections::BTreeMap;
use std::io::Read;

/// Definition of a record as seen through the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: Id,
    pub database: String,
    pub name: String,
    /// Full path from the root, e.g. `/sitecore/content/Home`
    pub path: String,
    /// `None` for root records
    pub parent_id: Option<Id>,
    pub template_id: Id,
    pub branch_id: Option<Id>,
    pub created: Option<DateTime<Utc>>,
}

/// Parameters for creating a record
#[derive(Debug, Clone)]
pub struct CreateRecord {
    pub parent_id: Option<Id>,
    pub name: String,
    pub template_id: Id,
    pub id: Id,
    pub created: Option<DateTime<Utc>>,
}

/// Field definition looked up by field id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    /// Human readable type label, e.g. `Single-Line Text`
    pub type_label: String,
    /// Internal type key, e.g. `attachment`
    pub type_key: String,
}

/// Scope of an edit transaction
///
/// Without language and version the edit addresses record-level data
/// (definition and shared fields); with both it addresses one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditTarget {
    pub database: String,
    pub id: Id,
    pub language: Option<Language>,
    pub version: Option<VersionNumber>,
}

impl EditTarget {
    /// Record-level scope
    pub fn record(database: impl Into<String>, id: Id) -> Self {
        Self {
            database: database.into(),
            id,
            language: None,
            version: None,
        }
    }

    /// Scope of one version
    #[must_use]
    pub fn version(uri: &ItemUri) -> Self {
        Self {
            database: uri.database.clone(),
            id: uri.id,
            language: Some(uri.language.clone()),
            version: Some(uri.version),
        }
    }

    #[must_use]
    pub fn is_version(&self) -> bool {
        self.language.is_some() && self.version.is_some()
    }
}

/// Pending changes between `begin_edit` and `end_edit`
#[derive(Debug, Clone)]
pub struct RecordEdit {
    pub target: EditTarget,
    pub name: Option<String>,
    pub template_id: Option<Id>,
    /// `Some(None)` clears the branch
    pub branch_id: Option<Option<Id>>,
    pub fields: BTreeMap<Id, String>,
    /// Leave `__Created` / `__Updated` untouched
    pub read_only_statistics: bool,
    /// Replace every field of the scope instead of merging
    pub save_all: bool,
}

impl RecordEdit {
    #[must_use]
    pub fn new(target: EditTarget) -> Self {
        Self {
            target,
            name: None,
            template_id: None,
            branch_id: None,
            fields: BTreeMap::new(),
            read_only_statistics: false,
            save_all: false,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn set_template(&mut self, template_id: Id) {
        self.template_id = Some(template_id);
    }

    pub fn set_branch(&mut self, branch_id: Option<Id>) {
        self.branch_id = Some(branch_id);
    }

    pub fn set_field(&mut self, field_id: Id, value: impl Into<String>) {
        self.fields.insert(field_id, value.into());
    }
}

/// Repository primitives the installer is built on
///
/// Reads take `&self`; anything that changes the tree takes `&mut self`.
/// An installation owns the store exclusively for its whole run.
pub trait ContentStore: Send {
    fn has_database(&self, database: &str) -> bool;

    fn get_record(&self, database: &str, id: Id) -> Result<Option<Record>, StorageError>;

    fn get_record_by_path(&self, database: &str, path: &str)
        -> Result<Option<Record>, StorageError>;

    /// Direct children in store order
    fn children(&self, database: &str, id: Id) -> Result<Vec<Record>, StorageError>;

    /// Create a record without versions
    fn create_record(&mut self, database: &str, request: CreateRecord)
        -> Result<Record, StorageError>;

    /// Return the record at `path`, creating missing folders on the way
    fn ensure_path(&mut self, database: &str, path: &str) -> Result<Record, StorageError>;

    fn move_record(&mut self, database: &str, id: Id, new_parent: Id) -> Result<(), StorageError>;

    /// Delete a record together with its descendants
    fn delete_record(&mut self, database: &str, id: Id) -> Result<(), StorageError>;

    fn begin_edit(&self, target: EditTarget) -> Result<RecordEdit, StorageError>;

    /// Commit an edit; version-scoped edits create the version when missing
    fn end_edit(&mut self, edit: RecordEdit) -> Result<(), StorageError>;

    /// Field value in a scope, falling back to record-level data
    fn field_value(&self, target: &EditTarget, field_id: Id) -> Result<Option<String>, StorageError>;

    fn field_definition(&self, database: &str, field_id: Id) -> Option<FieldDefinition>;

    /// Existing version numbers of a record in one language, ascending
    fn version_numbers(
        &self,
        database: &str,
        id: Id,
        language: &Language,
    ) -> Result<Vec<VersionNumber>, StorageError>;

    fn remove_version(&mut self, uri: &ItemUri) -> Result<(), StorageError>;

    /// Drop every version of a record, and its shared fields when asked
    fn remove_version_data(
        &mut self,
        database: &str,
        id: Id,
        remove_shared: bool,
    ) -> Result<(), StorageError>;

    fn set_blob(&mut self, database: &str, blob_id: Id, data: &mut dyn Read)
        -> Result<(), StorageError>;

    fn get_blob(&self, database: &str, blob_id: Id) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a media stream for a version and point its file path field at it
    ///
    /// Returns the storage path, or `None` when the store keeps no file.
    fn write_media(
        &mut self,
        uri: &ItemUri,
        field_id: Id,
        data: &mut dyn Read,
    ) -> Result<Option<String>, StorageError>;
}
