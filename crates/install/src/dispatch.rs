//! Routing of entries to typed sinks by key prefix

use crate::session::{Session, Sink};
use cpkg_errors::Error;
use cpkg_events::{AppEvent, EventEmitter, PackageEvent};
use cpkg_types::{EntryKind, PackageEntry};

/// Sink that forwards each entry to the sink registered for its key prefix
///
/// `flush` and `finish` run on every registered sink in registration order.
#[derive(Default)]
pub struct SinkDispatcher {
    sinks: Vec<(EntryKind, Box<dyn Sink>)>,
}

impl SinkDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sink for one entry kind, replacing any previous one
    pub fn add_sink(&mut self, kind: EntryKind, sink: impl Sink + 'static) {
        let sink: Box<dyn Sink> = Box::new(sink);
        if let Some(slot) = self.sinks.iter_mut().find(|(k, _)| *k == kind) {
            slot.1 = sink;
        } else {
            self.sinks.push((kind, sink));
        }
    }

    #[must_use]
    pub fn handles(&self, kind: EntryKind) -> bool {
        self.sinks.iter().any(|(k, _)| *k == kind)
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<EntryKind> {
        self.sinks.iter().map(|(kind, _)| *kind).collect()
    }
}

impl Sink for SinkDispatcher {
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error> {
        let kind = entry.kind();
        match self.sinks.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, sink)) => sink.put(session, entry),
            None => {
                tracing::warn!(key = entry.key(), "no sink for entry, ignoring");
                session.emit(AppEvent::Package(PackageEvent::EntryIgnored {
                    key: entry.key().to_string(),
                }));
                Ok(())
            }
        }
    }

    fn flush(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        for (_, sink) in &mut self.sinks {
            sink.flush(session)?;
        }
        Ok(())
    }

    fn finish(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        for (_, sink) in &mut self.sinks {
            sink.finish(session)?;
        }
        Ok(())
    }
}
