#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! BLAKE3 content hashing for cpkg
//!
//! Blob payloads are deduplicated by content hash within one installation,
//! and declared media file paths are mapped to blob ids through the same
//! hash function.

use cpkg_types::Id;
use std::fmt;

/// BLAKE3 digest of a blob payload or a declared path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Identifier made of the first 16 bytes of this hash
    #[must_use]
    pub fn to_id(&self) -> Id {
        let mut head = [0u8; 16];
        head.copy_from_slice(&self.0[..16]);
        Id::from_bytes(head)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Blob id under which the media stream of a declared file path is packaged
///
/// The path is hashed exactly as written in the record's file-path field.
#[must_use]
pub fn path_blob_id(declared_path: &str) -> Id {
    Hash::from_data(declared_path.as_bytes()).to_id()
}
