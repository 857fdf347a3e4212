use cpkg_types::ItemUri;
use std::path::PathBuf;

/// Installation result
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Package name as read from the metadata entries
    pub package: String,
    /// Versions committed by the item installer
    pub installed_items: Vec<ItemUri>,
    /// Stub records created to unblock dependent entries
    pub stubs_created: usize,
    /// Blob entries written to the store
    pub blobs_installed: usize,
    /// Blob entries dropped (unreferenced, unknown database, bad key)
    pub blobs_skipped: usize,
    /// Files written below the files root
    pub files_installed: Vec<PathBuf>,
    /// Records deleted by the content restorer
    pub records_deleted: usize,
    /// Records the content restorer failed to delete
    pub delete_failures: usize,
}

impl InstallReport {
    /// Add committed versions
    pub fn add_installed(&mut self, items: impl IntoIterator<Item = ItemUri>) {
        self.installed_items.extend(items);
    }

    /// Add a written file
    pub fn add_file(&mut self, path: PathBuf) {
        self.files_installed.push(path);
    }

    /// Get total number of changes
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.installed_items.len()
            + self.blobs_installed
            + self.files_installed.len()
            + self.records_deleted
    }
}
