//! Version payload documents
//!
//! Every item entry carries one JSON document describing a single version of
//! a record: its identity, template, parent and the field values.

use crate::{time, Id};
use chrono::{DateTime, Utc};
use cpkg_errors::PackageError;
use serde::{Deserialize, Serialize};

/// Field key holding the pipe-separated base template ids of a template
pub const BASE_TEMPLATE_FIELD_KEY: &str = "__base template";

/// Field key holding the creation timestamp
pub const CREATED_FIELD_KEY: &str = "__created";

/// Serialized form of one record version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// Template id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<Id>,
    /// Branch (master) id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<Id>,
    /// Legacy branch id, used when `mid` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
}

/// One field value of a version document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNode {
    /// Template field id
    pub tfid: Id,
    #[serde(default)]
    pub key: String,
    /// Absent content means the field is not written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Parsed version payload, cached per entry across scheduling passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    pub name: String,
    pub id: Option<Id>,
    pub template_id: Id,
    pub base_template_ids: Vec<Id>,
    pub parent_id: Option<Id>,
    pub branch_id: Option<Id>,
    pub created: Option<DateTime<Utc>>,
    /// Raw language code; invalid codes fall back to invariant at install time
    pub language: Option<String>,
    pub version: Option<u32>,
    /// Fields in payload order, only those with content
    pub fields: Vec<(Id, String)>,
}

impl ItemDescriptor {
    /// Parse an entry payload
    ///
    /// `fallback_template` is used when the document carries no template id
    /// (the id from the entry key).
    ///
    /// # Errors
    ///
    /// Returns `PackageError::InvalidPayload` when the bytes are not a valid
    /// version document.
    pub fn parse(key: &str, bytes: &[u8], fallback_template: Id) -> Result<Self, PackageError> {
        let document: VersionDocument =
            serde_json::from_slice(bytes).map_err(|e| PackageError::InvalidPayload {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_document(document, fallback_template))
    }

    #[must_use]
    pub fn from_document(document: VersionDocument, fallback_template: Id) -> Self {
        let field_content = |wanted: &str| {
            document
                .fields
                .iter()
                .find(|field| field.key.eq_ignore_ascii_case(wanted))
                .and_then(|field| field.content.as_deref())
        };

        let base_template_ids = field_content(BASE_TEMPLATE_FIELD_KEY)
            .map(|value| value.split('|').filter_map(Id::try_parse).collect())
            .unwrap_or_default();

        let created = document
            .created
            .as_deref()
            .and_then(time::parse_iso)
            .or_else(|| field_content(CREATED_FIELD_KEY).and_then(time::parse_iso));

        let fields = document
            .fields
            .iter()
            .filter_map(|field| field.content.clone().map(|content| (field.tfid, content)))
            .collect();

        Self {
            name: document.name,
            id: document.id,
            template_id: document.tid.unwrap_or(fallback_template),
            base_template_ids,
            parent_id: document.parent,
            branch_id: document.mid.or(document.bid),
            created,
            language: document.language,
            version: document.version,
            fields,
        }
    }

    /// Template id followed by every base template id
    pub fn template_dependencies(&self) -> impl Iterator<Item = Id> + '_ {
        std::iter::once(self.template_id).chain(self.base_template_ids.iter().copied())
    }

    #[must_use]
    pub fn field(&self, field_id: Id) -> Option<&str> {
        self.fields
            .iter()
            .find(|(id, _)| *id == field_id)
            .map(|(_, value)| value.as_str())
    }
}
