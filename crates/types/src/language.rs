//! Content languages

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const INVARIANT: &str = "invariant";

/// Language of a record version
///
/// `Invariant` holds data that is not tied to any language; every other
/// language is a culture code such as `en` or `da-DK`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Language {
    #[default]
    Invariant,
    Named(String),
}

impl Language {
    /// Parse a language code
    ///
    /// `invariant` (any case) maps to [`Language::Invariant`]. Returns `None`
    /// for empty text or codes containing characters other than ASCII
    /// letters, digits and `-`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let code = s.trim();
        if code.is_empty() {
            return None;
        }
        if code.eq_ignore_ascii_case(INVARIANT) {
            return Some(Self::Invariant);
        }
        if code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            Some(Self::Named(code.to_string()))
        } else {
            None
        }
    }

    /// Parse an optional code, falling back to `Invariant` when absent or invalid
    #[must_use]
    pub fn parse_or_invariant(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or_default()
    }

    #[must_use]
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant)
    }

    /// Code as written in package keys
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Invariant => INVARIANT,
            Self::Named(code) => code,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid language: {s}")))
    }
}
