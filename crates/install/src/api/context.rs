use crate::api::hooks::{FileInstallerEvents, ItemInstallerEvents};
use crate::api::result::InstallReport;
use cpkg_config::Config;
use cpkg_errors::Error;
use cpkg_events::{EventEmitter, EventSender};
use cpkg_store::ContentStore;
use cpkg_types::PackageMetadata;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Processor run after every sink has finished
///
/// Post actions are queued on the [`ProcessingContext`] by sinks (the item
/// installer registers its content restorer there) or by the caller, and run
/// in registration order once the package has been applied.
pub trait PostAction: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run the action, consuming it
    ///
    /// # Errors
    ///
    /// Returns an error to abort the remaining post actions.
    fn run(
        self: Box<Self>,
        store: &mut dyn ContentStore,
        context: &mut ProcessingContext,
    ) -> Result<(), Error>;
}

/// Severity of a task output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Info,
    Error,
}

/// Text report collected for the caller during post-install processing
#[derive(Debug, Clone, Default)]
pub struct TaskOutput {
    lines: Vec<(OutputLevel, String)>,
}

impl TaskOutput {
    pub fn info(&mut self, message: impl Into<String>) {
        self.lines.push((OutputLevel::Info, message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.lines.push((OutputLevel::Error, message.into()));
    }

    #[must_use]
    pub fn lines(&self) -> &[(OutputLevel, String)] {
        &self.lines
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|(level, _)| *level == OutputLevel::Error)
    }
}

/// Run-scoped context shared by the installer, its sinks and post actions
///
/// Optional capabilities (conflict and file hooks) are explicit slots checked
/// where they are needed; when a slot is empty the configured default answer
/// applies.
pub struct ProcessingContext {
    /// Installer configuration
    pub config: Config,
    /// Package metadata collected from `metadata/*` entries
    pub metadata: PackageMetadata,
    /// Cooperative cancellation for the whole run
    pub cancel: CancellationToken,
    /// Output sink for post-install reporting
    pub output: TaskOutput,
    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,

    item_events: Option<Box<dyn ItemInstallerEvents>>,
    file_events: Option<Box<dyn FileInstallerEvents>>,
    post_actions: Vec<Box<dyn PostAction>>,
    pub(crate) report: InstallReport,
}

context_builder! {
    ProcessingContext {
        config: Config,
        metadata: PackageMetadata,
        cancel: CancellationToken,
    }
    slots {
        output,
        item_events,
        file_events,
        post_actions,
        report,
    }
}

impl ProcessingContext {
    /// Install the conflict-resolution hook
    #[must_use]
    pub fn with_item_events(mut self, events: impl ItemInstallerEvents + 'static) -> Self {
        self.set_item_events(events);
        self
    }

    /// Install the file overwrite hook
    #[must_use]
    pub fn with_file_events(mut self, events: impl FileInstallerEvents + 'static) -> Self {
        self.set_file_events(events);
        self
    }

    pub fn set_item_events(&mut self, events: impl ItemInstallerEvents + 'static) {
        self.item_events = Some(Box::new(events));
    }

    pub fn set_file_events(&mut self, events: impl FileInstallerEvents + 'static) {
        self.file_events = Some(Box::new(events));
    }

    #[must_use]
    pub fn has_item_events(&self) -> bool {
        self.item_events.is_some()
    }

    #[must_use]
    pub fn has_file_events(&self) -> bool {
        self.file_events.is_some()
    }

    #[must_use]
    pub fn item_events(&self) -> Option<&dyn ItemInstallerEvents> {
        self.item_events.as_deref()
    }

    #[must_use]
    pub fn file_events(&self) -> Option<&dyn FileInstallerEvents> {
        self.file_events.as_deref()
    }

    pub fn add_post_action(&mut self, action: impl PostAction + 'static) {
        self.post_actions.push(Box::new(action));
    }

    #[must_use]
    pub fn post_action_count(&self) -> usize {
        self.post_actions.len()
    }

    pub(crate) fn take_post_actions(&mut self) -> Vec<Box<dyn PostAction>> {
        std::mem::take(&mut self.post_actions)
    }

    /// Package name used to label logs and events
    #[must_use]
    pub fn package_name(&self) -> String {
        self.metadata.display_name().to_string()
    }

    /// Fail with `Error::Cancelled` once cancellation was requested
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when the token has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl EventEmitter for ProcessingContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("config", &self.config)
            .field("metadata", &self.metadata)
            .field("has_item_events", &self.has_item_events())
            .field("has_file_events", &self.has_file_events())
            .field("post_actions", &self.post_actions.len())
            .finish_non_exhaustive()
    }
}
