//! Core types for corpus chunks.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::fingerprint::Fingerprint;

/// Tag value used when a chunk carries no country or category.
pub const DEFAULT_TAG: &str = "general";

/// Content type used when the sidecar does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "text";

/// Structured metadata attached to a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTags {
    pub country: String,
    pub category: String,
    /// Path or URL the text came from. Never used in queries.
    pub source: String,
    pub content_type: String,
}

impl Default for ChunkTags {
    fn default() -> Self {
        Self {
            country: DEFAULT_TAG.to_string(),
            category: DEFAULT_TAG.to_string(),
            source: String::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl ChunkTags {
    /// Tags with the given country and category, blank values falling back
    /// to `"general"`.
    pub fn new(country: &str, category: &str) -> Self {
        Self {
            country: tag_or_default(country),
            category: tag_or_default(category),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        let trimmed = content_type.trim();
        self.content_type = if trimmed.is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }
}

/// Trim a tag, substituting `"general"` for blank values.
pub fn tag_or_default(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_TAG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// One unit of knowledge-base text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Source identifier, plus `#<ordinal>` when the source was split.
    pub id: String,
    pub content: String,
    /// Digest of `content`'s bytes.
    pub fingerprint: Fingerprint,
    pub tags: ChunkTags,
}

impl Chunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>, tags: ChunkTags) -> Self {
        let content = content.into();
        let fingerprint = Fingerprint::of_str(&content);
        Self {
            id: id.into(),
            content,
            fingerprint,
            tags,
        }
    }

    /// True when there is nothing worth embedding.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// At most `max_chars` characters of content, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }
}

/// A document the corpus can load into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentRef {
    /// Identifier relative to the corpus root.
    pub id: String,
    /// Backing file, when the corpus is file based.
    pub path: Option<PathBuf>,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
        }
    }

    pub fn with_path(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            path: Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_tags_fall_back_to_general() {
        let tags = ChunkTags::new("  ", "");
        assert_eq!(tags.country, "general");
        assert_eq!(tags.category, "general");
        assert_eq!(tags.content_type, "text");

        let tags = ChunkTags::new(" Netherlands ", "visa");
        assert_eq!(tags.country, "Netherlands");
    }

    #[test]
    fn test_chunk_fingerprint_tracks_content() {
        let a = Chunk::new("a.txt", "same text", ChunkTags::default());
        let b = Chunk::new("b.txt", "same text", ChunkTags::new("Germany", "visa"));
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_preview_is_char_safe() {
        let chunk = Chunk::new("x", "héllo wörld", ChunkTags::default());
        assert_eq!(chunk.preview(2), "hé");
        assert_eq!(chunk.preview(100), "héllo wörld");
        assert_eq!(chunk.preview(0), "");
    }

    #[test]
    fn test_blank_detection() {
        assert!(Chunk::new("x", " \n\t", ChunkTags::default()).is_blank());
        assert!(!Chunk::new("x", " a ", ChunkTags::default()).is_blank());
    }
}
