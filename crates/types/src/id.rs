//! Record identifiers

use cpkg_errors::PackageError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a content record, template or blob
///
/// Parses with or without surrounding braces and always prints in the
/// braced upper-case form used by package keys, e.g.
/// `{110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id(Uuid);

impl Id {
    /// The all-zero identifier
    pub const NULL: Self = Self(Uuid::nil());

    /// Generate a fresh random identifier
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identifier from 16 raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    /// Parse an identifier, accepting `{...}` or the bare hyphenated form
    ///
    /// # Errors
    ///
    /// Returns `PackageError::InvalidId` when the text is not a GUID.
    pub fn parse(s: &str) -> Result<Self, PackageError> {
        Self::try_parse(s).ok_or_else(|| PackageError::InvalidId {
            value: s.to_string(),
        })
    }

    /// Parse an identifier, returning `None` when the text is not a GUID
    #[must_use]
    pub fn try_parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        Uuid::parse_str(inner).ok().map(Self)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.0)
    }
}

impl FromStr for Id {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_braced_and_bare() {
        let braced = Id::parse("{110d559f-dea5-42ea-9c1c-8a5df7e70ef9}").unwrap();
        let bare = Id::parse("110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9").unwrap();
        assert_eq!(braced, bare);
        assert_eq!(braced.to_string(), "{110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Id::try_parse("home").is_none());
        assert!(Id::try_parse("").is_none());
        assert!(matches!(
            Id::parse("{not-a-guid}"),
            Err(PackageError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_null() {
        assert!(Id::NULL.is_null());
        assert!(!Id::new_random().is_null());
    }
}
