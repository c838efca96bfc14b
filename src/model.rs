use serde::{Deserialize, Serialize};

/// Stored flag value meaning "decorative". Anything else, or an absent flag,
/// reads as not decorative.
pub const DECORATIVE_TRUE: &str = "true";

/// A media attachment as the core logic sees it. The flag is a literal
/// "true"/"false" string in the store and on the wire; it becomes a real
/// bool here, at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: i64,
    pub alt_text: String,
    pub decorative: bool,
}

impl Attachment {
    pub fn from_stored(id: i64, alt_text: String, flag: Option<&str>) -> Self {
        Self {
            id,
            alt_text,
            decorative: flag == Some(DECORATIVE_TRUE),
        }
    }
}

/// One entry of the attachment source manifest. A missing `id` is a type
/// error rejected by serde when the manifest is parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentEntry {
    pub id: i64,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub decorative: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentManifest {
    pub manifest_version: u32,
    pub attachments: Vec<AttachmentEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub attachments_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestCounts {
    pub manifest_attachment_count: usize,
    pub attachments_upserted: usize,
    pub flags_upserted: usize,
    pub attachments_total: i64,
    pub flags_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub source_sha256: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
}
