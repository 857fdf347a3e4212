//! Well-known record and field identifiers of the target store
//!
//! These are the defaults for [`crate::WellKnownIds`]; stores with a
//! different taxonomy override them in the `[ids]` table.

/// Template of records that define a template field
pub const TEMPLATE_FIELD_TEMPLATE: &str = "{455A3E98-A627-4B40-8035-E683A0331AC7}";

/// Template of language definition records
pub const LANGUAGE_TEMPLATE: &str = "{F68F13A6-3395-426A-B9A1-FA2DC60D94EB}";

/// `__Created` statistics field
pub const CREATED_FIELD: &str = "{25BED78C-4957-4165-998A-CA1B52F67497}";

/// `__Updated` statistics field
pub const UPDATED_FIELD: &str = "{D9CF14B1-FA16-4BA6-9288-E8A174D4D522}";

/// "Shared" checkbox of a template field definition
pub const SHARED_FIELD: &str = "{BE351A73-FCB0-4213-93FA-C302D8AB4F51}";

/// "Unversioned" checkbox of a template field definition
pub const UNVERSIONED_FIELD: &str = "{39847666-389D-409B-95BD-F2016F11EED5}";

/// Field type label of a plain text field
pub const FILE_PATH_FIELD_TYPE: &str = "Single-Line Text";

/// Name of the field that declares an external media file
pub const FILE_PATH_FIELD_NAME: &str = "file path";

/// Type key of binary attachment fields
pub const ATTACHMENT_FIELD_TYPE: &str = "attachment";

/// Attachment values shorter than this are candidate blob links
pub const BLOB_LINK_MAX_LEN: usize = 50;

/// Middle key segment of blob entries that carry media file streams
pub const MEDIA_STREAMS_MARKER: &str = "mediastreams";
