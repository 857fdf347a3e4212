#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the cpkg content package installer
//!
//! This crate provides the fundamental types used throughout the system:
//! record identifiers, languages and version numbers, entry keys and the
//! references they encode, collision options, package entries and the
//! version payload documents they carry.

pub mod document;
pub mod entry;
pub mod id;
pub mod info;
pub mod language;
pub mod options;
pub mod reference;
pub mod time;
pub mod version;

// Re-export commonly used types
pub use document::{FieldNode, ItemDescriptor, VersionDocument};
pub use entry::{PackageEntry, Payload};
pub use id::Id;
pub use info::{ItemInfo, PackageMetadata};
pub use language::Language;
pub use options::{BehaviourOptions, CollisionKind, InstallMode, MergeMode, VersionInstallMode};
pub use reference::{BlobKey, EntryKind, ItemReference, ItemUri};
pub use uuid::Uuid;
pub use version::VersionNumber;
