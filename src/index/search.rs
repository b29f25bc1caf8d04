//! Filtered search results.

use serde::Serialize;

use super::metadata::EntryMetadata;
use crate::vector::RowId;

/// Text shown when nothing has been indexed.
pub const EMPTY_KNOWLEDGE_BASE: &str = "(knowledge base empty)";
/// Text shown when no row survives the filters.
pub const NO_RELEVANT_MATCHES: &str = "(no relevant matches)";

/// Optional exact-match filters on chunk tags.
///
/// Values are compared case-insensitively. Blank values are treated as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    country: Option<String>,
    category: Option<String>,
}

impl SearchFilter {
    pub fn new(country: Option<&str>, category: Option<&str>) -> Self {
        Self {
            country: normalize_filter(country),
            category: normalize_filter(category),
        }
    }

    pub fn country(mut self, country: &str) -> Self {
        self.country = normalize_filter(Some(country));
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = normalize_filter(Some(category));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.category.is_none()
    }

    pub fn accepts(&self, entry: &EntryMetadata) -> bool {
        entry.matches(self.country.as_deref(), self.category.as_deref())
    }
}

fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// One accepted row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub row: RowId,
    pub score: f32,
    pub id: String,
    pub country: String,
    pub category: String,
    pub source: String,
    pub content: String,
}

impl SearchHit {
    pub(crate) fn new(row: RowId, score: f32, entry: &EntryMetadata) -> Self {
        Self {
            row,
            score,
            id: entry.id.clone(),
            country: entry.country.clone(),
            category: entry.category.clone(),
            source: entry.source.clone(),
            content: entry.content.clone(),
        }
    }
}

/// Result of a search.
///
/// Empty outcomes are not errors: callers render them as context for the
/// language model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "hits", rename_all = "snake_case")]
pub enum SearchOutcome {
    Matches(Vec<SearchHit>),
    EmptyKnowledgeBase,
    NoMatches,
}

impl SearchOutcome {
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            Self::Matches(hits) => hits,
            _ => &[],
        }
    }

    /// Previews joined by a blank line, or a placeholder.
    pub fn render(&self) -> String {
        match self {
            Self::Matches(hits) => hits
                .iter()
                .map(|h| h.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::EmptyKnowledgeBase => EMPTY_KNOWLEDGE_BASE.to_string(),
            Self::NoMatches => NO_RELEVANT_MATCHES.to_string(),
        }
    }
}
