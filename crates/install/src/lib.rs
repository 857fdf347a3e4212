#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! Content package installation for cpkg
//!
//! This crate applies a package (an ordered stream of keyed entries) to a
//! content store. Entries are routed by key prefix to typed sinks: package
//! metadata, item versions, binary blobs and plain files. The item installer
//! schedules its entries in passes so that templates land before the records
//! built from them, resolves collisions with existing records, and queues
//! overwritten children for deletion until the end of the run.

#[macro_use]
mod macros;
mod api;
mod blob;
mod dispatch;
mod files;
mod installer;
mod items;
mod metadata;
mod session;
mod source;

pub use blob::{BlobContext, BlobInstaller, BlobLink, FileReference};
pub use dispatch::SinkDispatcher;
pub use files::FileInstaller;
pub use installer::PackageInstaller;
pub use items::{ContentRestorer, ItemInstaller};
pub use metadata::MetadataSink;
pub use session::{Session, Sink};
pub use source::{sort_entries, DirectorySource, EntrySorter, EntrySource, MemorySource};

// Re-export the public API surface from api module
pub use api::context::{OutputLevel, PostAction, ProcessingContext, TaskOutput};
pub use api::hooks::{DefaultItemInstallerEvents, FileInstallerEvents, ItemInstallerEvents};
pub use api::result::InstallReport;

// Re-export EventSender for use by macros and contexts
pub use cpkg_events::EventSender;
