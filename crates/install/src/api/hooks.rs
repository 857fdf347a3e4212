//! Decision hooks injected by the caller

use crate::api::context::ProcessingContext;
use cpkg_config::ConflictConfig;
use cpkg_errors::Error;
use cpkg_types::{BehaviourOptions, ItemInfo};
use std::path::Path;

/// Conflict-resolution hook consulted when an incoming record collides with
/// an existing one and the entry carries no options of its own
pub trait ItemInstallerEvents: Send {
    /// Decide how to install `incoming` over `existing`
    ///
    /// The returned flag asks the installer to reuse the answer for every
    /// later collision of the same kind in this run.
    ///
    /// # Errors
    ///
    /// Any error aborts the installation. `Error::Cancelled` is propagated
    /// as is; other errors are reported as a conflict resolution failure.
    fn ask_user(
        &self,
        existing: &ItemInfo,
        incoming: &ItemInfo,
        context: &ProcessingContext,
    ) -> Result<(BehaviourOptions, bool), Error>;
}

/// Hook consulted before a file entry replaces an existing file
pub trait FileInstallerEvents: Send {
    /// Return `(overwrite, apply_to_all)` for an existing destination
    ///
    /// # Errors
    ///
    /// Any error aborts the installation.
    fn ask_overwrite(&self, path: &Path, context: &ProcessingContext)
        -> Result<(bool, bool), Error>;
}

/// Fixed answer used when no conflict hook is installed
#[derive(Debug, Clone, Copy)]
pub struct DefaultItemInstallerEvents {
    options: BehaviourOptions,
    apply_to_all: bool,
}

impl DefaultItemInstallerEvents {
    #[must_use]
    pub fn new(options: BehaviourOptions, apply_to_all: bool) -> Self {
        Self {
            options,
            apply_to_all,
        }
    }

    #[must_use]
    pub fn from_config(config: &ConflictConfig) -> Self {
        let (options, apply_to_all) = config.default_answer();
        Self::new(options, apply_to_all)
    }
}

impl ItemInstallerEvents for DefaultItemInstallerEvents {
    fn ask_user(
        &self,
        _existing: &ItemInfo,
        _incoming: &ItemInfo,
        _context: &ProcessingContext,
    ) -> Result<(BehaviourOptions, bool), Error> {
        Ok((self.options, self.apply_to_all))
    }
}
