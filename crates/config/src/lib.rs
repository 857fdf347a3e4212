#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for cpkg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/cpkg/config.toml)
//! - Environment variables

pub mod constants;

use cpkg_errors::{ConfigError, Error};
use cpkg_types::{BehaviourOptions, Id, InstallMode, MergeMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub conflicts: ConflictConfig,

    #[serde(default)]
    pub fields: FieldConfig,

    #[serde(default)]
    pub ids: WellKnownIds,

    #[serde(default)]
    pub blobs: BlobConfig,

    #[serde(default)]
    pub files: FileConfig,
}

/// Answer used for collisions when no conflict hook is installed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    #[serde(default = "default_item_mode")]
    pub item_mode: InstallMode,
    #[serde(default = "default_merge_mode")]
    pub merge_mode: MergeMode,
    #[serde(default = "default_apply_to_all")]
    pub apply_to_all: bool,
}

/// Field taxonomy used by the blob installer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Type label of fields that may declare a media file path
    #[serde(default = "default_file_path_type")]
    pub file_path_type: String,
    /// Name of the field declaring a media file path (case-insensitive)
    #[serde(default = "default_file_path_name")]
    pub file_path_name: String,
    /// Type key of binary attachment fields
    #[serde(default = "default_attachment_type")]
    pub attachment_type: String,
    /// Attachment values shorter than this that parse as an id are blob links
    #[serde(default = "default_blob_link_max_len")]
    pub blob_link_max_len: usize,
}

/// Identifiers of records and fields with built-in meaning in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellKnownIds {
    #[serde(default = "default_template_field_template")]
    pub template_field_template: Id,
    #[serde(default = "default_language_template")]
    pub language_template: Id,
    #[serde(default = "default_created_field")]
    pub created_field: Id,
    #[serde(default = "default_updated_field")]
    pub updated_field: Id,
    #[serde(default = "default_shared_field")]
    pub shared_field: Id,
    #[serde(default = "default_unversioned_field")]
    pub unversioned_field: Id,
}

/// Blob entry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Middle key segment marking media file streams
    #[serde(default = "default_media_marker")]
    pub media_marker: String,
}

/// File entry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory `files/*` entries are written below; unset skips file entries
    pub root: Option<PathBuf>,
    /// Overwrite existing files when no file hook is installed
    #[serde(default = "default_overwrite_files")]
    pub overwrite: bool,
}

// Default implementations

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            item_mode: default_item_mode(),
            merge_mode: default_merge_mode(),
            apply_to_all: default_apply_to_all(),
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            file_path_type: default_file_path_type(),
            file_path_name: default_file_path_name(),
            attachment_type: default_attachment_type(),
            blob_link_max_len: default_blob_link_max_len(),
        }
    }
}

impl Default for WellKnownIds {
    fn default() -> Self {
        Self {
            template_field_template: default_template_field_template(),
            language_template: default_language_template(),
            created_field: default_created_field(),
            updated_field: default_updated_field(),
            shared_field: default_shared_field(),
            unversioned_field: default_unversioned_field(),
        }
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            media_marker: default_media_marker(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: None,
            overwrite: default_overwrite_files(),
        }
    }
}

// Default value functions for serde
fn default_item_mode() -> InstallMode {
    InstallMode::Merge
}

fn default_merge_mode() -> MergeMode {
    MergeMode::Clear
}

fn default_apply_to_all() -> bool {
    true
}

fn default_file_path_type() -> String {
    constants::FILE_PATH_FIELD_TYPE.to_string()
}

fn default_file_path_name() -> String {
    constants::FILE_PATH_FIELD_NAME.to_string()
}

fn default_attachment_type() -> String {
    constants::ATTACHMENT_FIELD_TYPE.to_string()
}

fn default_blob_link_max_len() -> usize {
    constants::BLOB_LINK_MAX_LEN
}

fn well_known(value: &str) -> Id {
    Id::try_parse(value).unwrap_or(Id::NULL)
}

fn default_template_field_template() -> Id {
    well_known(constants::TEMPLATE_FIELD_TEMPLATE)
}

fn default_language_template() -> Id {
    well_known(constants::LANGUAGE_TEMPLATE)
}

fn default_created_field() -> Id {
    well_known(constants::CREATED_FIELD)
}

fn default_updated_field() -> Id {
    well_known(constants::UPDATED_FIELD)
}

fn default_shared_field() -> Id {
    well_known(constants::SHARED_FIELD)
}

fn default_unversioned_field() -> Id {
    well_known(constants::UNVERSIONED_FIELD)
}

fn default_media_marker() -> String {
    constants::MEDIA_STREAMS_MARKER.to_string()
}

fn default_overwrite_files() -> bool {
    true
}

impl ConflictConfig {
    /// Options and apply-to-all flag used as the default conflict answer
    #[must_use]
    pub fn default_answer(&self) -> (BehaviourOptions, bool) {
        (
            BehaviourOptions::new(self.item_mode, self.merge_mode),
            self.apply_to_all,
        )
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("cpkg").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, if the file contents
    /// contain invalid TOML syntax, or if a value fails validation.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded installer configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Check values that cannot be expressed through types alone
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty or multi-segment
    /// media marker, a zero blob link length, or an undefined default item mode.
    pub fn validate(&self) -> Result<(), Error> {
        let marker = &self.blobs.media_marker;
        if marker.is_empty() || marker.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "blobs.media_marker".to_string(),
                value: marker.clone(),
            }
            .into());
        }
        if self.fields.blob_link_max_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fields.blob_link_max_len".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.conflicts.item_mode == InstallMode::Undefined {
            return Err(ConfigError::InvalidValue {
                field: "conflicts.item_mode".to_string(),
                value: self.conflicts.item_mode.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // CPKG_ITEM_MODE
        if let Ok(mode) = std::env::var("CPKG_ITEM_MODE") {
            self.conflicts.item_mode = mode.parse().map_err(|_| ConfigError::InvalidValue {
                field: "CPKG_ITEM_MODE".to_string(),
                value: mode,
            })?;
        }

        // CPKG_MERGE_MODE
        if let Ok(mode) = std::env::var("CPKG_MERGE_MODE") {
            self.conflicts.merge_mode = mode.parse().map_err(|_| ConfigError::InvalidValue {
                field: "CPKG_MERGE_MODE".to_string(),
                value: mode,
            })?;
        }

        // CPKG_APPLY_TO_ALL
        if let Ok(flag) = std::env::var("CPKG_APPLY_TO_ALL") {
            self.conflicts.apply_to_all = parse_bool("CPKG_APPLY_TO_ALL", flag)?;
        }

        // CPKG_FILE_PATH_TYPE
        if let Ok(label) = std::env::var("CPKG_FILE_PATH_TYPE") {
            self.fields.file_path_type = label;
        }

        // CPKG_MEDIA_MARKER
        if let Ok(marker) = std::env::var("CPKG_MEDIA_MARKER") {
            self.blobs.media_marker = marker;
        }

        // CPKG_FILES_ROOT
        if let Ok(root) = std::env::var("CPKG_FILES_ROOT") {
            self.files.root = Some(PathBuf::from(root));
        }

        // CPKG_OVERWRITE_FILES
        if let Ok(flag) = std::env::var("CPKG_OVERWRITE_FILES") {
            self.files.overwrite = parse_bool("CPKG_OVERWRITE_FILES", flag)?;
        }

        self.validate()
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
