//! File-system corpus: `*.txt` documents with optional `*.json` sidecars.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use super::chunker::{Chunker, SentenceChunker, WholeDocument};
use super::types::{Chunk, ChunkTags, DEFAULT_TAG, DocumentRef};
use super::{Corpus, CorpusError};
use crate::config::{ChunkingConfig, CorpusConfig};

/// Metadata sidecar stored next to a document as `<name>.json`.
#[derive(Debug, Default, Deserialize)]
struct Sidecar {
    country: Option<String>,
    category: Option<String>,
    source_url: Option<String>,
    source_path: Option<String>,
    #[serde(rename = "type")]
    content_type: Option<String>,
}

/// Corpus backed by a directory tree.
pub struct DirectoryCorpus {
    root: PathBuf,
    infer_tags: bool,
    chunker: Box<dyn Chunker>,
}

impl std::fmt::Debug for DirectoryCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCorpus")
            .field("root", &self.root)
            .field("infer_tags", &self.infer_tags)
            .finish()
    }
}

impl DirectoryCorpus {
    /// One chunk per file, no tag inference.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            infer_tags: false,
            chunker: Box::new(WholeDocument),
        }
    }

    /// Build from settings sections.
    pub fn from_config(root: PathBuf, corpus: &CorpusConfig, chunking: &ChunkingConfig) -> Self {
        let chunker: Box<dyn Chunker> = if chunking.enabled {
            Box::new(SentenceChunker::new(chunking.max_chunk_chars))
        } else {
            Box::new(WholeDocument)
        };
        Self {
            root,
            infer_tags: corpus.infer_tags,
            chunker,
        }
    }

    pub fn with_inferred_tags(mut self, infer: bool) -> Self {
        self.infer_tags = infer;
        self
    }

    pub fn with_chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn read_sidecar(path: &Path) -> Sidecar {
        let sidecar_path = path.with_extension("json");
        if !sidecar_path.is_file() {
            return Sidecar::default();
        }

        let parsed = std::fs::read_to_string(&sidecar_path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(sidecar) => sidecar,
            Err(e) => {
                tracing::warn!(
                    target: "corpus",
                    "ignoring unreadable metadata {}: {e}",
                    sidecar_path.display()
                );
                Sidecar::default()
            }
        }
    }

    fn tags_for(&self, path: &Path, id: &str) -> ChunkTags {
        let sidecar = Self::read_sidecar(path);

        let mut country = sidecar.country.filter(|v| !v.trim().is_empty());
        let mut category = sidecar.category.filter(|v| !v.trim().is_empty());

        if self.infer_tags {
            if country.is_none() {
                country = self.infer_country(path);
            }
            if category.is_none() {
                let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                category = Some(detect_category(&file_name).to_string());
            }
        }

        let source = sidecar
            .source_url
            .or(sidecar.source_path)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| id.to_string());

        ChunkTags::new(
            country.as_deref().unwrap_or(DEFAULT_TAG),
            category.as_deref().unwrap_or(DEFAULT_TAG),
        )
        .with_source(source)
        .with_content_type(sidecar.content_type.as_deref().unwrap_or(""))
    }

    /// Country is the name of the folder holding the file, unless that folder
    /// is the corpus root itself.
    fn infer_country(&self, path: &Path) -> Option<String> {
        let parent = path.parent()?;
        if parent == self.root {
            return None;
        }
        parent.file_name().map(|n| n.to_string_lossy().to_string())
    }
}

impl Corpus for DirectoryCorpus {
    fn documents(&self) -> Result<Vec<DocumentRef>, CorpusError> {
        if !self.root.is_dir() {
            return Err(CorpusError::RootMissing(self.root.clone()));
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(CorpusError::Walk(e.to_string())),
                Err(e) => {
                    tracing::warn!(target: "corpus", "skipping unreadable entry: {e}");
                    // Listed anyway so the pass counts it as failed and
                    // compaction keeps the rows indexed beneath it.
                    if let Some(path) = e.path() {
                        documents.push(DocumentRef::with_path(self.relative_id(path), path.to_path_buf()));
                    }
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                documents.push(DocumentRef::with_path(self.relative_id(path), path.to_path_buf()));
            }
        }

        tracing::debug!(
            target: "corpus",
            "found {} documents under {}",
            documents.len(),
            self.root.display()
        );
        Ok(documents)
    }

    fn load(&self, document: &DocumentRef) -> Result<Vec<Chunk>, CorpusError> {
        let path = document
            .path
            .clone()
            .unwrap_or_else(|| self.root.join(&document.id));

        let bytes = std::fs::read(&path).map_err(|source| CorpusError::Io {
            path: path.clone(),
            source,
        })?;
        let content =
            String::from_utf8(bytes).map_err(|_| CorpusError::Decode { path: path.clone() })?;

        let tags = self.tags_for(&path, &document.id);
        let pieces = self.chunker.chunk(&content);
        let split = pieces.len() > 1;

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| {
                let id = if split {
                    format!("{}#{ordinal}", document.id)
                } else {
                    document.id.clone()
                };
                Chunk::new(id, text, tags.clone())
            })
            .collect())
    }
}

/// Infer a topic category from keywords in a file name.
pub fn detect_category(file_name: &str) -> &'static str {
    let name = file_name.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| name.contains(w));

    if has(&["visa", "law", "permit"]) {
        "visa"
    } else if has(&["scholar", "fund"]) {
        "scholarship"
    } else if has(&["university", "admission", "program"]) {
        "university"
    } else if has(&["fee", "cost", "tuition"]) {
        "finance"
    } else {
        DEFAULT_TAG
    }
}
