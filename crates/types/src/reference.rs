//! Entry keys and the record references they encode

use crate::{Id, Language, VersionNumber};
use cpkg_errors::PackageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between key segments
pub const KEY_SEPARATOR: char = '/';

pub const ITEMS_PREFIX: &str = "items";
pub const BLOB_PREFIX: &str = "blob";
pub const FILES_PREFIX: &str = "files";
pub const METADATA_PREFIX: &str = "metadata";

/// Kind of a package entry, selected by the first key segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Metadata,
    Items,
    Blob,
    Files,
    Unknown,
}

impl EntryKind {
    /// Classify a key by its prefix segment
    #[must_use]
    pub fn classify(key: &str) -> Self {
        let prefix = key.split(KEY_SEPARATOR).next().unwrap_or_default();
        if prefix.eq_ignore_ascii_case(ITEMS_PREFIX) {
            Self::Items
        } else if prefix.eq_ignore_ascii_case(BLOB_PREFIX) {
            Self::Blob
        } else if prefix.eq_ignore_ascii_case(FILES_PREFIX) {
            Self::Files
        } else if prefix.eq_ignore_ascii_case(METADATA_PREFIX) {
            Self::Metadata
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Items => write!(f, "items"),
            Self::Blob => write!(f, "blob"),
            Self::Files => write!(f, "files"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Compare two record paths the way the store does (ASCII case-insensitive)
#[must_use]
pub fn paths_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Parent of a record path, `None` for a root path
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    let (parent, _) = path.rsplit_once(KEY_SEPARATOR)?;
    if parent.is_empty() {
        None
    } else {
        Some(parent)
    }
}

/// Last segment of a record path
#[must_use]
pub fn path_name(path: &str) -> &str {
    path.rsplit(KEY_SEPARATOR).next().unwrap_or(path)
}

/// A specific version of a record as named by an item entry key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemReference {
    pub database: String,
    pub path: String,
    pub id: Id,
    /// Template id as written in the key; the payload may override it
    pub template_id: Id,
    pub language: Language,
    pub version: VersionNumber,
}

impl ItemReference {
    /// Parse `items/<database>/<path...>/<templateId>/<language>/<version>/<id>`
    ///
    /// # Errors
    ///
    /// Returns `PackageError::MalformedKey` when the key has the wrong prefix,
    /// too few segments, or an unparsable id, language or version segment.
    pub fn parse_key(key: &str) -> Result<Self, PackageError> {
        let malformed = |reason: &str| PackageError::MalformedKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(malformed("empty segment"));
        }
        let n = segments.len();
        if n < 7 {
            return Err(malformed("expected at least 7 segments"));
        }
        if !segments[0].eq_ignore_ascii_case(ITEMS_PREFIX) {
            return Err(malformed("not an item key"));
        }

        let template_id =
            Id::try_parse(segments[n - 4]).ok_or_else(|| malformed("invalid template id"))?;
        let language =
            Language::parse(segments[n - 3]).ok_or_else(|| malformed("invalid language"))?;
        let version =
            VersionNumber::parse(segments[n - 2]).map_err(|_| malformed("invalid version"))?;
        let id = Id::try_parse(segments[n - 1]).ok_or_else(|| malformed("invalid item id"))?;

        Ok(Self {
            database: segments[1].to_string(),
            path: format!("/{}", segments[2..n - 4].join("/")),
            id,
            template_id,
            language,
            version,
        })
    }

    /// Render the reference back into its entry key
    #[must_use]
    pub fn to_key(&self) -> String {
        format!(
            "{ITEMS_PREFIX}/{}{}/{}/{}/{}/{}",
            self.database, self.path, self.template_id, self.language, self.version, self.id
        )
    }

    /// Record name (last path segment)
    #[must_use]
    pub fn name(&self) -> &str {
        path_name(&self.path)
    }

    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        parent_path(&self.path)
    }

    /// Same database and id
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        self.database == other.database && self.id == other.id
    }

    /// Same database and path
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.database == other.database && paths_equal(&self.path, &other.path)
    }

    #[must_use]
    pub fn uri(&self) -> ItemUri {
        ItemUri {
            database: self.database.clone(),
            id: self.id,
            language: self.language.clone(),
            version: self.version,
        }
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.database, self.path, self.id)
    }
}

/// Address of one version of one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemUri {
    pub database: String,
    pub id: Id,
    pub language: Language,
    pub version: VersionNumber,
}

impl ItemUri {
    #[must_use]
    pub fn new(
        database: impl Into<String>,
        id: Id,
        language: Language,
        version: VersionNumber,
    ) -> Self {
        Self {
            database: database.into(),
            id,
            language,
            version,
        }
    }
}

impl fmt::Display for ItemUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}?lang={}&ver={}",
            self.database, self.id, self.language, self.version
        )
    }
}

/// Parsed `blob/<database-or-media-marker>/<guid>` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    /// Database name, or the media-streams marker for file payloads
    pub area: String,
    pub id: Id,
}

impl BlobKey {
    /// Parse a three-segment blob key
    ///
    /// # Errors
    ///
    /// Returns `PackageError::MalformedKey` unless the key has exactly three
    /// non-empty segments ending in a GUID.
    pub fn parse(key: &str) -> Result<Self, PackageError> {
        let malformed = |reason: &str| PackageError::MalformedKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if segments.len() != 3 {
            return Err(malformed("expected 3 segments"));
        }
        if segments[1].is_empty() {
            return Err(malformed("empty database segment"));
        }
        let id = Id::try_parse(segments[2]).ok_or_else(|| malformed("invalid blob id"))?;
        Ok(Self {
            area: segments[1].to_string(),
            id,
        })
    }
}

/// Relative path carried by a `files/<relative path>` key
#[must_use]
pub fn file_key_path(key: &str) -> Option<&str> {
    let (prefix, rest) = key.split_once(KEY_SEPARATOR)?;
    if prefix.eq_ignore_ascii_case(FILES_PREFIX) && !rest.is_empty() {
        Some(rest)
    } else {
        None
    }
}

/// Name carried by a `metadata/<name>` key
#[must_use]
pub fn metadata_key_name(key: &str) -> Option<&str> {
    let (prefix, rest) = key.split_once(KEY_SEPARATOR)?;
    if prefix.eq_ignore_ascii_case(METADATA_PREFIX) && !rest.is_empty() {
        Some(rest)
    } else {
        None
    }
}
