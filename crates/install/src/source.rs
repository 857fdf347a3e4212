//! Entry sources and the sorting pass in front of the dispatcher

use crate::session::{Session, Sink};
use cpkg_errors::Error;
use cpkg_types::{EntryKind, Id, ItemReference, Language, PackageEntry, VersionNumber};
use std::path::{Path, PathBuf};

/// Producer of package entries
///
/// The container format behind a source is opaque to the installer; all it
/// needs is the ordered list of keyed entries.
pub trait EntrySource {
    /// Label used in logs and events
    fn name(&self) -> String;

    /// Read every entry in package order
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying package cannot be read.
    fn read_entries(&mut self) -> Result<Vec<PackageEntry>, Error>;
}

/// Entries held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    entries: Vec<PackageEntry>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_entry(mut self, entry: PackageEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: PackageEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntrySource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_entries(&mut self) -> Result<Vec<PackageEntry>, Error> {
        Ok(self.entries.clone())
    }
}

/// Unpacked package: every file below the root is one entry keyed by its
/// relative path, payloads are opened on demand
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, entries: &mut Vec<PackageEntry>) -> Result<(), Error> {
        let mut children = std::fs::read_dir(dir)
            .map_err(|e| Error::io_with_path(&e, dir))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::io_with_path(&e, dir))?;
        children.sort_by_key(std::fs::DirEntry::file_name);

        for child in children {
            let path = child.path();
            let file_type = child
                .file_type()
                .map_err(|e| Error::io_with_path(&e, &path))?;
            if file_type.is_dir() {
                self.collect(&path, entries)?;
            } else if file_type.is_file() {
                let relative = path
                    .strip_prefix(&self.root)
                    .map_err(|e| Error::internal(e.to_string()))?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                entries.push(PackageEntry::new(key).with_file(path));
            }
        }
        Ok(())
    }
}

impl EntrySource for DirectorySource {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn read_entries(&mut self) -> Result<Vec<PackageEntry>, Error> {
        let mut entries = Vec::new();
        self.collect(&self.root, &mut entries)?;
        Ok(entries)
    }
}

/// Ordering key of an item entry: every version of one record is adjacent
type ItemSortKey = (String, String, Id, Language, VersionNumber);

fn kind_rank(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::Metadata => 0,
        EntryKind::Items => 1,
        EntryKind::Blob => 2,
        EntryKind::Files => 3,
        EntryKind::Unknown => 4,
    }
}

fn item_sort_key(entry: &PackageEntry) -> Option<ItemSortKey> {
    let reference = ItemReference::parse_key(entry.key()).ok()?;
    Some((
        reference.database,
        reference.path.to_ascii_lowercase(),
        reference.id,
        reference.language,
        reference.version,
    ))
}

/// Sort entries so related ones are adjacent
///
/// Stable: metadata, items, blobs, files, then anything else. Items are
/// grouped by database, path, id, language and version. Template
/// dependencies are not considered; the item installer resolves those.
pub fn sort_entries(entries: &mut [PackageEntry]) {
    entries.sort_by_cached_key(|entry| {
        let kind = entry.kind();
        let item = if kind == EntryKind::Items {
            item_sort_key(entry)
        } else {
            None
        };
        (kind_rank(kind), item)
    });
}

/// Reads a source, sorts its entries and feeds them to a sink
pub struct EntrySorter<'s> {
    source: &'s mut dyn EntrySource,
}

impl<'s> EntrySorter<'s> {
    pub fn new(source: &'s mut dyn EntrySource) -> Self {
        Self { source }
    }

    /// Put every sorted entry into `sink`
    ///
    /// # Errors
    ///
    /// Fails if the source cannot be read, the sink rejects an entry, or the
    /// run is cancelled between entries.
    pub fn populate(self, sink: &mut dyn Sink, session: &mut Session<'_>) -> Result<usize, Error> {
        let mut entries = self.source.read_entries()?;
        sort_entries(&mut entries);
        let count = entries.len();
        tracing::debug!(source = %self.source.name(), entries = count, "populating sinks");
        for entry in entries {
            session.check_cancelled()?;
            sink.put(session, entry)?;
        }
        Ok(count)
    }
}
