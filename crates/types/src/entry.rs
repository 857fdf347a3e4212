//! Package entries

use crate::reference::EntryKind;
use cpkg_errors::{Error, PackageError};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// Lazily opened entry payload
#[derive(Clone)]
pub enum Payload {
    /// Bytes already held in memory
    Bytes(Arc<[u8]>),
    /// Contents of a file, opened on demand
    File(PathBuf),
}

impl Payload {
    /// Open the payload for reading
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file-backed payload cannot be opened.
    pub fn open(&self) -> Result<Box<dyn Read + '_>, Error> {
        match self {
            Self::Bytes(bytes) => Ok(Box::new(Cursor::new(&bytes[..]))),
            Self::File(path) => {
                let file = std::fs::File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
                Ok(Box::new(file))
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

/// One keyed record of a package stream
///
/// Entries are immutable once read; the payload is only opened while the
/// entry is being applied.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    key: String,
    properties: BTreeMap<String, String>,
    payload: Option<Payload>,
}

impl PackageEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            properties: BTreeMap::new(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(Payload::Bytes(Arc::from(bytes.into())));
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.payload = Some(Payload::File(path.into()));
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        EntryKind::classify(&self.key)
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Open the payload stream
    ///
    /// # Errors
    ///
    /// Returns `PackageError::MissingPayload` for entries without payload, or
    /// an I/O error when a file-backed payload cannot be opened.
    pub fn open(&self) -> Result<Box<dyn Read + '_>, Error> {
        match &self.payload {
            Some(payload) => payload.open(),
            None => Err(PackageError::MissingPayload {
                key: self.key.clone(),
            }
            .into()),
        }
    }

    /// Read the whole payload into memory
    ///
    /// # Errors
    ///
    /// Same as [`PackageEntry::open`], plus read failures.
    pub fn read_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut reader = self.open()?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read the payload as UTF-8 text
    ///
    /// # Errors
    ///
    /// Fails like [`PackageEntry::read_bytes`], or with
    /// `PackageError::InvalidPayload` when the bytes are not UTF-8.
    pub fn read_text(&self) -> Result<String, Error> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| {
            PackageError::InvalidPayload {
                key: self.key.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }
}
