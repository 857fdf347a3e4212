//! Package metadata sink

use crate::session::{Session, Sink};
use cpkg_errors::Error;
use cpkg_events::{AppEvent, EventEmitter, PackageEvent};
use cpkg_types::reference::metadata_key_name;
use cpkg_types::PackageEntry;

/// Reads `metadata/<name>` entries into the processing context
#[derive(Debug, Default)]
pub struct MetadataSink;

impl MetadataSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sink for MetadataSink {
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error> {
        let Some(name) = metadata_key_name(entry.key()) else {
            tracing::warn!(key = entry.key(), "invalid metadata key");
            session.emit_entry_warning(entry.key(), "invalid metadata key");
            return Ok(());
        };
        let value = entry.read_text()?;
        let metadata = &mut session.context.metadata;
        let had_name = metadata.name.is_some();
        metadata.set(name, value.trim_end().to_string());

        if !had_name {
            if let Some(package) = metadata.name.clone() {
                tracing::info!(package = %package, "read package metadata");
                session.emit(AppEvent::Package(PackageEvent::MetadataRead { name: package }));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::ProcessingContext;
    use cpkg_store::MemoryStore;

    #[test]
    fn test_reads_metadata_entries() {
        let mut store = MemoryStore::new();
        let mut context = ProcessingContext::new();
        let mut sink = MetadataSink::new();
        {
            let mut session = Session::new(&mut store, &mut context);
            sink.put(
                &mut session,
                PackageEntry::new("metadata/sc_name.txt").with_bytes(b"Demo Package\n".to_vec()),
            )
            .unwrap();
            sink.put(
                &mut session,
                PackageEntry::new("metadata/sc_author.txt").with_bytes(b"Someone".to_vec()),
            )
            .unwrap();
            // no name segment
            sink.put(&mut session, PackageEntry::new("metadata")).unwrap();
        }
        assert_eq!(context.package_name(), "Demo Package");
        assert_eq!(context.metadata.author.as_deref(), Some("Someone"));
    }
}
