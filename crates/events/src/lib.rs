#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Installation events for cpkg
//!
//! Each phase of a run (package, items, blobs, files, restore) reports what it
//! did as an [`AppEvent`] on an unbounded channel. Sends never block and a
//! dropped receiver discards events, so observers cannot stall an install.
//! Entry-level problems that do not abort the run are reported as
//! [`GeneralEvent::Warning`] with the offending entry key.

pub mod events;
pub use events::{
    AppEvent, BlobEvent, FailureContext, FileEvent, GeneralEvent, ItemsEvent, PackageEvent,
    RestoreEvent,
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub type EventSender = UnboundedSender<AppEvent>;

pub type EventReceiver = UnboundedReceiver<AppEvent>;

#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Anything that may carry an event sender
///
/// Implemented by the processing context, the install session and the raw
/// sender; a missing sender turns every emit into a no-op.
pub trait EventEmitter {
    fn event_sender(&self) -> Option<&EventSender>;

    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // closed receiver: nobody is listening
            let _ = sender.send(event);
        }
    }

    /// Report a skipped or degraded entry
    fn emit_entry_warning(&self, key: impl Into<String>, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::entry_warning(key, message)));
    }

    /// Report a non-fatal failure not tied to one entry
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
