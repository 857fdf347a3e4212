use serde::{Deserialize, Serialize};

/// Problems that do not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// An entry was skipped or only partly applied
    Warning {
        key: String,
        message: String,
    },

    /// A failure that was logged and swallowed
    Error { message: String },
}

impl GeneralEvent {
    #[must_use]
    pub fn entry_warning(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warning {
            key: key.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
