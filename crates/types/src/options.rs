//! Collision handling options

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What to do with an existing record that collides with an incoming one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMode {
    #[default]
    Undefined,
    Overwrite,
    Merge,
    Skip,
    SideBySide,
}

/// How versions are combined when the install mode is `Merge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    #[default]
    Undefined,
    Clear,
    Append,
    Merge,
}

/// How an incoming version is written into its target record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionInstallMode {
    #[default]
    Undefined,
    /// Add a new version numbered after the existing ones
    Append,
    /// Write into the version number carried by the payload
    Merge,
    /// Leave the record untouched
    Skip,
}

/// Collision classification, used to scope cached decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    /// The existing record has the incoming record's id
    Id,
    /// A different record occupies the incoming record's path
    Path,
}

impl CollisionKind {
    /// Classify by comparing the existing and incoming identifiers
    #[must_use]
    pub fn classify(existing: crate::Id, incoming: crate::Id) -> Self {
        if existing == incoming {
            Self::Id
        } else {
            Self::Path
        }
    }

    /// Prefix of the entry properties that override options for this kind
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Id => "IdCollision",
            Self::Path => "PathCollision",
        }
    }
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}

impl FromStr for InstallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "undefined" => Ok(Self::Undefined),
            "overwrite" => Ok(Self::Overwrite),
            "merge" => Ok(Self::Merge),
            "skip" => Ok(Self::Skip),
            "sidebyside" => Ok(Self::SideBySide),
            _ => Err(format!("unknown item install mode: {s}")),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "undefined" => Ok(Self::Undefined),
            "clear" => Ok(Self::Clear),
            "append" => Ok(Self::Append),
            "merge" => Ok(Self::Merge),
            _ => Err(format!("unknown merge mode: {s}")),
        }
    }
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Overwrite => write!(f, "Overwrite"),
            Self::Merge => write!(f, "Merge"),
            Self::Skip => write!(f, "Skip"),
            Self::SideBySide => write!(f, "SideBySide"),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Clear => write!(f, "Clear"),
            Self::Append => write!(f, "Append"),
            Self::Merge => write!(f, "Merge"),
        }
    }
}

impl fmt::Display for VersionInstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "Undefined"),
            Self::Append => write!(f, "Append"),
            Self::Merge => write!(f, "Merge"),
            Self::Skip => write!(f, "Skip"),
        }
    }
}

/// Resolved answer to a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BehaviourOptions {
    pub item_mode: InstallMode,
    pub merge_mode: MergeMode,
}

impl BehaviourOptions {
    #[must_use]
    pub const fn new(item_mode: InstallMode, merge_mode: MergeMode) -> Self {
        Self {
            item_mode,
            merge_mode,
        }
    }

    /// Read `<prefix>.ItemMode` / `<prefix>.MergeMode` from entry properties
    ///
    /// Unparsable values are treated as undefined.
    #[must_use]
    pub fn from_properties(properties: &BTreeMap<String, String>, kind: CollisionKind) -> Self {
        let lookup = |suffix: &str| {
            let name = format!("{}.{suffix}", kind.prefix());
            properties
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(&name))
                .map(|(_, value)| value.as_str())
        };

        Self {
            item_mode: lookup("ItemMode")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            merge_mode: lookup("MergeMode")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Whether an item mode was chosen
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.item_mode != InstallMode::Undefined
    }

    /// Version install mode implied by these options
    #[must_use]
    pub fn version_install_mode(&self) -> VersionInstallMode {
        match (self.item_mode, self.merge_mode) {
            (InstallMode::Overwrite | InstallMode::SideBySide, _)
            | (InstallMode::Merge, MergeMode::Clear | MergeMode::Append) => {
                VersionInstallMode::Append
            }
            (InstallMode::Merge, MergeMode::Merge) => VersionInstallMode::Merge,
            (InstallMode::Skip, _) => VersionInstallMode::Skip,
            _ => VersionInstallMode::Undefined,
        }
    }
}

impl fmt::Display for BehaviourOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.item_mode, self.merge_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_install_mode_table() {
        let cases = [
            (InstallMode::Overwrite, MergeMode::Undefined, VersionInstallMode::Append),
            (InstallMode::Merge, MergeMode::Clear, VersionInstallMode::Append),
            (InstallMode::Merge, MergeMode::Append, VersionInstallMode::Append),
            (InstallMode::Merge, MergeMode::Merge, VersionInstallMode::Merge),
            (InstallMode::Merge, MergeMode::Undefined, VersionInstallMode::Undefined),
            (InstallMode::Skip, MergeMode::Undefined, VersionInstallMode::Skip),
            (InstallMode::SideBySide, MergeMode::Undefined, VersionInstallMode::Append),
            (InstallMode::Undefined, MergeMode::Merge, VersionInstallMode::Undefined),
        ];
        for (item, merge, expected) in cases {
            assert_eq!(
                BehaviourOptions::new(item, merge).version_install_mode(),
                expected,
                "{item}/{merge}"
            );
        }
    }

    #[test]
    fn test_from_properties() {
        let mut props = BTreeMap::new();
        props.insert("IdCollision.ItemMode".to_string(), "side-by-side".to_string());
        props.insert("pathcollision.itemmode".to_string(), "Merge".to_string());
        props.insert("PathCollision.MergeMode".to_string(), "append".to_string());

        let id = BehaviourOptions::from_properties(&props, CollisionKind::Id);
        assert_eq!(id.item_mode, InstallMode::SideBySide);
        assert_eq!(id.merge_mode, MergeMode::Undefined);

        let path = BehaviourOptions::from_properties(&props, CollisionKind::Path);
        assert_eq!(path, BehaviourOptions::new(InstallMode::Merge, MergeMode::Append));
    }

    #[test]
    fn test_classify() {
        let a = crate::Id::new_random();
        let b = crate::Id::new_random();
        assert_eq!(CollisionKind::classify(a, a), CollisionKind::Id);
        assert_eq!(CollisionKind::classify(a, b), CollisionKind::Path);
    }
}
