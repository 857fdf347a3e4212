//! Descriptive types shared with hooks and observers

use crate::Id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of a record shown to the conflict-resolution hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: Id,
    pub name: String,
    pub path: String,
    pub template_id: Id,
    pub database: String,
}

/// Package level metadata collected from `metadata/*` entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: Option<String>,
    pub package_id: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub readme: Option<String>,
    pub revision: Option<String>,
    pub post_step: Option<String>,
    /// Metadata entries with no dedicated field
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Store a metadata value by entry name (`sc_name.txt`, `name`, ...)
    pub fn set(&mut self, entry_name: &str, value: String) {
        let stem = entry_name
            .rsplit_once('.')
            .map_or(entry_name, |(stem, _)| stem);
        let stem = stem.strip_prefix("sc_").unwrap_or(stem);
        let slot = match stem.to_ascii_lowercase().as_str() {
            "name" => &mut self.name,
            "packageid" => &mut self.package_id,
            "version" => &mut self.version,
            "author" => &mut self.author,
            "publisher" => &mut self.publisher,
            "readme" => &mut self.readme,
            "revision" => &mut self.revision,
            "poststep" => &mut self.post_step,
            _ => {
                self.extra.insert(entry_name.to_string(), value);
                return;
            }
        };
        *slot = Some(value);
    }

    /// Name used to label log lines and events
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed package)")
    }
}
