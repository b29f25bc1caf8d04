//! Per-row metadata kept in the sidecar, parallel to the vector rows.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::corpus::{Chunk, tag_or_default};
use crate::fingerprint::Fingerprint;

/// Metadata for one index row.
///
/// Position in the sidecar array equals the row position in the vector blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub country: String,
    pub category: String,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    /// Preview of the chunk text, capped at `search.preview_chars`.
    pub content: String,
    /// UTC seconds since the epoch.
    #[serde(default)]
    pub indexed_at: u64,
}

fn default_content_type() -> String {
    crate::corpus::DEFAULT_CONTENT_TYPE.to_string()
}

impl EntryMetadata {
    pub fn from_chunk(chunk: &Chunk, preview_chars: usize, indexed_at: u64) -> Self {
        Self {
            id: chunk.id.clone(),
            fingerprint: chunk.fingerprint.clone(),
            country: tag_or_default(&chunk.tags.country),
            category: tag_or_default(&chunk.tags.category),
            source: chunk.tags.source.clone(),
            content_type: chunk.tags.content_type.clone(),
            content: chunk.preview(preview_chars).to_string(),
            indexed_at,
        }
    }

    /// Case-insensitive exact match on country and category.
    ///
    /// `None` filters match everything.
    pub fn matches(&self, country: Option<&str>, category: Option<&str>) -> bool {
        let tag_matches = |value: &str, wanted: Option<&str>| {
            wanted.is_none_or(|wanted| value.to_lowercase() == wanted)
        };
        tag_matches(&self.country, country) && tag_matches(&self.category, category)
    }
}

/// Current UTC time in seconds.
pub fn utc_timestamp() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
