//! In-process record store

use crate::{ContentStore, CreateRecord, EditTarget, FieldDefinition, Record, RecordEdit};
use chrono::{DateTime, Utc};
use cpkg_config::WellKnownIds;
use cpkg_errors::StorageError;
use cpkg_types::reference::KEY_SEPARATOR;
use cpkg_types::{time, Id, ItemUri, Language, VersionNumber};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// Template assigned to folders created by `ensure_path`
const FOLDER_TEMPLATE: &str = "{A87A00B1-E6DB-45AB-8B54-636FEC3B5523}";

/// Parent chains deeper than this are treated as corrupted
const MAX_DEPTH: usize = 256;

type FieldMap = BTreeMap<Id, String>;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<Id>,
    template_id: Id,
    branch_id: Option<Id>,
    created: Option<DateTime<Utc>>,
    seq: u64,
    shared: FieldMap,
    versions: BTreeMap<Language, BTreeMap<VersionNumber, FieldMap>>,
}

#[derive(Debug, Default)]
struct Database {
    records: HashMap<Id, Node>,
    blobs: HashMap<Id, Vec<u8>>,
    next_seq: u64,
}

/// Record store held entirely in memory
///
/// Children keep creation order, path lookups are case-insensitive and
/// return the earliest created match when siblings share a name.
#[derive(Debug)]
pub struct MemoryStore {
    databases: BTreeMap<String, Database>,
    field_definitions: HashMap<Id, FieldDefinition>,
    media: BTreeMap<String, Vec<u8>>,
    validate_templates: bool,
    folder_template: Id,
    created_field: Id,
    updated_field: Id,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let ids = WellKnownIds::default();
        Self {
            databases: BTreeMap::new(),
            field_definitions: HashMap::new(),
            media: BTreeMap::new(),
            validate_templates: false,
            folder_template: Id::try_parse(FOLDER_TEMPLATE).unwrap_or(Id::NULL),
            created_field: ids.created_field,
            updated_field: ids.updated_field,
        }
    }

    #[must_use]
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.add_database(name);
        self
    }

    /// Reject record creation when the template record is absent
    #[must_use]
    pub fn with_template_validation(mut self, enabled: bool) -> Self {
        self.validate_templates = enabled;
        self
    }

    #[must_use]
    pub fn with_field(mut self, field_id: Id, definition: FieldDefinition) -> Self {
        self.define_field(field_id, definition);
        self
    }

    pub fn add_database(&mut self, name: impl Into<String>) {
        self.databases.entry(name.into()).or_default();
    }

    pub fn define_field(&mut self, field_id: Id, definition: FieldDefinition) {
        self.field_definitions.insert(field_id, definition);
    }

    #[must_use]
    pub fn folder_template(&self) -> Id {
        self.folder_template
    }

    #[must_use]
    pub fn record_count(&self, database: &str) -> usize {
        self.databases
            .get(database)
            .map_or(0, |db| db.records.len())
    }

    #[must_use]
    pub fn blob_count(&self, database: &str) -> usize {
        self.databases.get(database).map_or(0, |db| db.blobs.len())
    }

    #[must_use]
    pub fn has_blob(&self, database: &str, blob_id: Id) -> bool {
        self.databases
            .get(database)
            .is_some_and(|db| db.blobs.contains_key(&blob_id))
    }

    /// Media bytes written under a storage path
    #[must_use]
    pub fn media(&self, path: &str) -> Option<&[u8]> {
        self.media.get(path).map(Vec::as_slice)
    }

    /// Field values of one version, `None` when the version does not exist
    #[must_use]
    pub fn version_fields(&self, uri: &ItemUri) -> Option<&BTreeMap<Id, String>> {
        self.databases
            .get(&uri.database)?
            .records
            .get(&uri.id)?
            .versions
            .get(&uri.language)?
            .get(&uri.version)
    }

    /// Record-level field values
    #[must_use]
    pub fn shared_fields(&self, database: &str, id: Id) -> Option<&BTreeMap<Id, String>> {
        self.databases
            .get(database)?
            .records
            .get(&id)
            .map(|node| &node.shared)
    }

    /// Languages holding at least one version of a record
    #[must_use]
    pub fn languages(&self, database: &str, id: Id) -> Vec<Language> {
        self.databases
            .get(database)
            .and_then(|db| db.records.get(&id))
            .map(|node| {
                node.versions
                    .iter()
                    .filter(|(_, versions)| !versions.is_empty())
                    .map(|(language, _)| language.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn database(&self, name: &str) -> Result<&Database, StorageError> {
        self.databases
            .get(name)
            .ok_or_else(|| StorageError::DatabaseNotFound {
                database: name.to_string(),
            })
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut Database, StorageError> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| StorageError::DatabaseNotFound {
                database: name.to_string(),
            })
    }

    fn node_mut<'a>(
        db: &'a mut Database,
        database: &str,
        id: Id,
    ) -> Result<&'a mut Node, StorageError> {
        db.records
            .get_mut(&id)
            .ok_or_else(|| StorageError::RecordNotFound {
                database: database.to_string(),
                id: id.to_string(),
            })
    }

    fn insert_node(
        db: &mut Database,
        id: Id,
        name: String,
        parent: Option<Id>,
        template_id: Id,
        created: Option<DateTime<Utc>>,
    ) {
        let seq = db.next_seq;
        db.next_seq += 1;
        db.records.insert(
            id,
            Node {
                name,
                parent,
                template_id,
                branch_id: None,
                created,
                seq,
                shared: FieldMap::new(),
                versions: BTreeMap::new(),
            },
        );
    }
}

impl Database {
    fn path_of(&self, id: Id) -> Result<String, StorageError> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if segments.len() > MAX_DEPTH {
                return Err(StorageError::CorruptedData {
                    message: format!("parent chain of {id} does not terminate"),
                });
            }
            let node = self
                .records
                .get(&node_id)
                .ok_or_else(|| StorageError::CorruptedData {
                    message: format!("dangling parent {node_id}"),
                })?;
            segments.push(node.name.as_str());
            current = node.parent;
        }
        segments.reverse();
        Ok(format!("{KEY_SEPARATOR}{}", segments.join("/")))
    }

    fn record(&self, database: &str, id: Id) -> Result<Option<Record>, StorageError> {
        let Some(node) = self.records.get(&id) else {
            return Ok(None);
        };
        Ok(Some(Record {
            id,
            database: database.to_string(),
            name: node.name.clone(),
            path: self.path_of(id)?,
            parent_id: node.parent,
            template_id: node.template_id,
            branch_id: node.branch_id,
            created: node.created,
        }))
    }

    /// Ids of the direct children of `parent` (roots for `None`) in creation order
    fn child_ids(&self, parent: Option<Id>) -> Vec<Id> {
        let mut children: Vec<(u64, Id)> = self
            .records
            .iter()
            .filter(|(_, node)| node.parent == parent)
            .map(|(id, node)| (node.seq, *id))
            .collect();
        children.sort_unstable();
        children.into_iter().map(|(_, id)| id).collect()
    }

    fn child_named(&self, parent: Option<Id>, name: &str) -> Option<Id> {
        self.child_ids(parent).into_iter().find(|id| {
            self.records
                .get(id)
                .is_some_and(|node| node.name.eq_ignore_ascii_case(name))
        })
    }

    fn is_descendant_or_self(&self, candidate: Id, ancestor: Id) -> bool {
        let mut current = Some(candidate);
        let mut depth = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            depth += 1;
            if depth > MAX_DEPTH {
                return false;
            }
            current = self.records.get(&id).and_then(|node| node.parent);
        }
        false
    }

    fn descendants(&self, id: Id) -> Vec<Id> {
        let mut found = vec![id];
        let mut index = 0;
        while index < found.len() {
            let current = found[index];
            found.extend(
                self.records
                    .iter()
                    .filter(|(_, node)| node.parent == Some(current))
                    .map(|(child, _)| *child),
            );
            index += 1;
        }
        found
    }
}

fn path_segments(path: &str) -> Result<Vec<&str>, StorageError> {
    let segments: Vec<&str> = path
        .split(KEY_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect();
    if !path.starts_with(KEY_SEPARATOR) || segments.is_empty() {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

impl ContentStore for MemoryStore {
    fn has_database(&self, database: &str) -> bool {
        self.databases.contains_key(database)
    }

    fn get_record(&self, database: &str, id: Id) -> Result<Option<Record>, StorageError> {
        self.database(database)?.record(database, id)
    }

    fn get_record_by_path(
        &self,
        database: &str,
        path: &str,
    ) -> Result<Option<Record>, StorageError> {
        let db = self.database(database)?;
        let Ok(segments) = path_segments(path) else {
            return Ok(None);
        };
        let mut current = None;
        for segment in segments {
            match db.child_named(current, segment) {
                Some(id) => current = Some(id),
                None => return Ok(None),
            }
        }
        match current {
            Some(id) => db.record(database, id),
            None => Ok(None),
        }
    }

    fn children(&self, database: &str, id: Id) -> Result<Vec<Record>, StorageError> {
        let db = self.database(database)?;
        let mut records = Vec::new();
        for child in db.child_ids(Some(id)) {
            if let Some(record) = db.record(database, child)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn create_record(
        &mut self,
        database: &str,
        request: CreateRecord,
    ) -> Result<Record, StorageError> {
        let validate_templates = self.validate_templates;
        let db = self.database_mut(database)?;
        let id = if request.id.is_null() {
            Id::new_random()
        } else {
            request.id
        };
        if db.records.contains_key(&id) {
            return Err(StorageError::DuplicateRecord {
                database: database.to_string(),
                id: id.to_string(),
            });
        }
        if let Some(parent) = request.parent_id {
            if !db.records.contains_key(&parent) {
                return Err(StorageError::ParentNotFound {
                    database: database.to_string(),
                    id: parent.to_string(),
                });
            }
        }
        if validate_templates && !db.records.contains_key(&request.template_id) {
            return Err(StorageError::EditRejected {
                database: database.to_string(),
                id: id.to_string(),
                reason: format!("template {} does not exist", request.template_id),
            });
        }

        Self::insert_node(
            db,
            id,
            request.name,
            request.parent_id,
            request.template_id,
            request.created,
        );
        let record = db.record(database, id)?.ok_or_else(|| StorageError::RecordNotFound {
            database: database.to_string(),
            id: id.to_string(),
        })?;
        tracing::debug!(database, id = %id, path = %record.path, "created record");
        Ok(record)
    }

    fn ensure_path(&mut self, database: &str, path: &str) -> Result<Record, StorageError> {
        let folder_template = self.folder_template;
        let segments = path_segments(path)?;
        let db = self.database_mut(database)?;
        let mut current = None;
        for segment in segments {
            let next = if let Some(existing) = db.child_named(current, segment) {
                existing
            } else {
                let id = Id::new_random();
                Self::insert_node(
                    db,
                    id,
                    segment.to_string(),
                    current,
                    folder_template,
                    Some(Utc::now()),
                );
                tracing::debug!(database, id = %id, segment, "created folder");
                id
            };
            current = Some(next);
        }
        let id = current.ok_or_else(|| StorageError::InvalidPath {
            path: path.to_string(),
        })?;
        db.record(database, id)?
            .ok_or_else(|| StorageError::RecordNotFound {
                database: database.to_string(),
                id: id.to_string(),
            })
    }

    fn move_record(&mut self, database: &str, id: Id, new_parent: Id) -> Result<(), StorageError> {
        let db = self.database_mut(database)?;
        if !db.records.contains_key(&new_parent) {
            return Err(StorageError::ParentNotFound {
                database: database.to_string(),
                id: new_parent.to_string(),
            });
        }
        if db.is_descendant_or_self(new_parent, id) {
            return Err(StorageError::InvalidMove {
                database: database.to_string(),
                id: id.to_string(),
                reason: "target parent lies inside the moved subtree".to_string(),
            });
        }
        Self::node_mut(db, database, id)?.parent = Some(new_parent);
        Ok(())
    }

    fn delete_record(&mut self, database: &str, id: Id) -> Result<(), StorageError> {
        let db = self.database_mut(database)?;
        if !db.records.contains_key(&id) {
            return Err(StorageError::RecordNotFound {
                database: database.to_string(),
                id: id.to_string(),
            });
        }
        let doomed = db.descendants(id);
        for record in &doomed {
            db.records.remove(record);
        }
        tracing::debug!(database, id = %id, removed = doomed.len(), "deleted record");
        Ok(())
    }

    fn begin_edit(&self, target: EditTarget) -> Result<RecordEdit, StorageError> {
        let db = self.database(&target.database)?;
        if !db.records.contains_key(&target.id) {
            return Err(StorageError::RecordNotFound {
                database: target.database.clone(),
                id: target.id.to_string(),
            });
        }
        Ok(RecordEdit::new(target))
    }

    fn end_edit(&mut self, edit: RecordEdit) -> Result<(), StorageError> {
        let created_field = self.created_field;
        let updated_field = self.updated_field;
        let RecordEdit {
            target,
            name,
            template_id,
            branch_id,
            fields,
            read_only_statistics,
            save_all,
        } = edit;

        let db = self.database_mut(&target.database)?;
        let node = Self::node_mut(db, &target.database, target.id)?;

        if let Some(name) = name {
            if name.is_empty() || name.contains(KEY_SEPARATOR) {
                return Err(StorageError::EditRejected {
                    database: target.database.clone(),
                    id: target.id.to_string(),
                    reason: format!("invalid record name '{name}'"),
                });
            }
            node.name = name;
        }
        if let Some(template_id) = template_id {
            node.template_id = template_id;
        }
        if let Some(branch_id) = branch_id {
            node.branch_id = branch_id;
        }

        let (Some(language), Some(version)) = (target.language, target.version) else {
            if save_all {
                node.shared = fields;
            } else {
                node.shared.extend(fields);
            }
            return Ok(());
        };

        let versions = node.versions.entry(language).or_default();
        let is_new = !versions.contains_key(&version);
        let slot = versions.entry(version).or_default();
        if save_all {
            *slot = fields;
        } else {
            slot.extend(fields);
        }
        if !read_only_statistics {
            let now = time::to_iso(&Utc::now());
            if is_new {
                slot.entry(created_field).or_insert_with(|| now.clone());
            }
            slot.insert(updated_field, now);
        }
        Ok(())
    }

    fn field_value(
        &self,
        target: &EditTarget,
        field_id: Id,
    ) -> Result<Option<String>, StorageError> {
        let db = self.database(&target.database)?;
        let node = db
            .records
            .get(&target.id)
            .ok_or_else(|| StorageError::RecordNotFound {
                database: target.database.clone(),
                id: target.id.to_string(),
            })?;
        let versioned = match (&target.language, target.version) {
            (Some(language), Some(version)) => node
                .versions
                .get(language)
                .and_then(|versions| versions.get(&version))
                .and_then(|fields| fields.get(&field_id)),
            _ => None,
        };
        Ok(versioned.or_else(|| node.shared.get(&field_id)).cloned())
    }

    fn field_definition(&self, _database: &str, field_id: Id) -> Option<FieldDefinition> {
        self.field_definitions.get(&field_id).cloned()
    }

    fn version_numbers(
        &self,
        database: &str,
        id: Id,
        language: &Language,
    ) -> Result<Vec<VersionNumber>, StorageError> {
        let db = self.database(database)?;
        let node = db
            .records
            .get(&id)
            .ok_or_else(|| StorageError::RecordNotFound {
                database: database.to_string(),
                id: id.to_string(),
            })?;
        Ok(node
            .versions
            .get(language)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default())
    }

    fn remove_version(&mut self, uri: &ItemUri) -> Result<(), StorageError> {
        let db = self.database_mut(&uri.database)?;
        let node = Self::node_mut(db, &uri.database, uri.id)?;
        if let Some(versions) = node.versions.get_mut(&uri.language) {
            versions.remove(&uri.version);
            if versions.is_empty() {
                node.versions.remove(&uri.language);
            }
        }
        Ok(())
    }

    fn remove_version_data(
        &mut self,
        database: &str,
        id: Id,
        remove_shared: bool,
    ) -> Result<(), StorageError> {
        let db = self.database_mut(database)?;
        let node = Self::node_mut(db, database, id)?;
        node.versions.clear();
        if remove_shared {
            node.shared.clear();
        }
        Ok(())
    }

    fn set_blob(
        &mut self,
        database: &str,
        blob_id: Id,
        data: &mut dyn Read,
    ) -> Result<(), StorageError> {
        let db = self.database_mut(database)?;
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .map_err(|e| StorageError::IoError {
                message: e.to_string(),
            })?;
        db.blobs.insert(blob_id, bytes);
        Ok(())
    }

    fn get_blob(&self, database: &str, blob_id: Id) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.database(database)?.blobs.get(&blob_id).cloned())
    }

    fn write_media(
        &mut self,
        uri: &ItemUri,
        field_id: Id,
        data: &mut dyn Read,
    ) -> Result<Option<String>, StorageError> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .map_err(|e| StorageError::IoError {
                message: e.to_string(),
            })?;
        let path = format!("/media/{}.dat", Id::new_random().as_uuid().simple());

        let mut edit = self.begin_edit(EditTarget::version(uri))?;
        edit.set_field(field_id, path.clone());
        edit.read_only_statistics = true;
        self.end_edit(edit)?;

        self.media.insert(path.clone(), bytes);
        tracing::debug!(uri = %uri, path = %path, "wrote media stream");
        Ok(Some(path))
    }
}
