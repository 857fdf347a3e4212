//! File installer: `files/<relative path>` entries written below the files root

use crate::session::{Session, Sink};
use cpkg_errors::{Error, InstallError};
use cpkg_events::{AppEvent, EventEmitter, FileEvent};
use cpkg_types::reference::file_key_path;
use cpkg_types::PackageEntry;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Sink for file entries, applied on flush
#[derive(Debug, Default)]
pub struct FileInstaller {
    queue: Vec<(PathBuf, PackageEntry)>,
    /// Overwrite answer reused for the rest of the run
    overwrite_all: Option<bool>,
}

impl FileInstaller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn skip(session: &Session<'_>, entry: &PackageEntry, reason: &str) {
        tracing::warn!(key = entry.key(), reason, "file entry skipped");
        session.emit(AppEvent::Files(FileEvent::Skipped {
            key: entry.key().to_string(),
            reason: reason.to_string(),
        }));
    }

    fn should_overwrite(&mut self, session: &Session<'_>, destination: &Path) -> Result<bool, Error> {
        if let Some(answer) = self.overwrite_all {
            return Ok(answer);
        }
        let (overwrite, apply_to_all) = match session.context.file_events() {
            Some(events) => events.ask_overwrite(destination, session.context)?,
            None => (session.context.config.files.overwrite, true),
        };
        if apply_to_all {
            self.overwrite_all = Some(overwrite);
        }
        Ok(overwrite)
    }

    fn install(
        &mut self,
        session: &mut Session<'_>,
        relative: &Path,
        entry: &PackageEntry,
    ) -> Result<(), Error> {
        let Some(root) = session.context.config.files.root.clone() else {
            Self::skip(session, entry, "no files root configured");
            return Ok(());
        };
        let destination = root.join(relative);

        if destination.exists() && !self.should_overwrite(session, &destination)? {
            Self::skip(session, entry, "destination exists");
            return Ok(());
        }

        let bytes = write_atomically(entry, &destination).map_err(|message| {
            InstallError::FileCopyFailed {
                path: destination.display().to_string(),
                message,
            }
        })?;
        tracing::info!(path = %destination.display(), bytes, "installed file");
        session.emit(AppEvent::Files(FileEvent::Installed {
            path: destination.clone(),
            bytes,
        }));
        session.context.report.add_file(destination);
        Ok(())
    }
}

/// Relative path of a file key, `None` when it is absolute or leaves the root
fn safe_relative_path(key: &str) -> Option<PathBuf> {
    let path = Path::new(file_key_path(key)?);
    if path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        Some(path.to_path_buf())
    } else {
        None
    }
}

/// Copy the payload next to the destination, then move it into place
fn write_atomically(entry: &PackageEntry, destination: &Path) -> Result<u64, String> {
    let parent = destination
        .parent()
        .ok_or_else(|| "destination has no parent directory".to_string())?;
    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;

    let mut reader = entry.open().map_err(|e| e.to_string())?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| e.to_string())?;
    let bytes = io::copy(&mut reader, &mut temp).map_err(|e| e.to_string())?;
    temp.persist(destination).map_err(|e| e.error.to_string())?;
    Ok(bytes)
}

impl Sink for FileInstaller {
    fn put(&mut self, session: &mut Session<'_>, entry: PackageEntry) -> Result<(), Error> {
        match safe_relative_path(entry.key()) {
            Some(relative) => self.queue.push((relative, entry)),
            None => Self::skip(session, &entry, "invalid file path"),
        }
        Ok(())
    }

    fn flush(&mut self, session: &mut Session<'_>) -> Result<(), Error> {
        for (relative, entry) in std::mem::take(&mut self.queue) {
            session.check_cancelled()?;
            self.install(session, &relative, &entry)?;
        }
        Ok(())
    }
}
