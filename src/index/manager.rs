//! The knowledge index: incremental sync, filtered search, and maintenance.
//!
//! A `KnowledgeIndex` owns the vector rows and their parallel metadata, both
//! in memory and on disk. Mutating passes (`sync`, `compact`, `rebuild`)
//! serialize on a writer lock. Searches take the state lock shared and always
//! see a committed prefix: `sync` embeds without holding the state lock and
//! takes it exclusively only to append and persist one batch.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::error::{IndexError, IndexResult};
use super::metadata::{EntryMetadata, utc_timestamp};
use super::persistence::{IndexPaths, load_pair, save_pair};
use super::search::{SearchFilter, SearchHit, SearchOutcome};
use crate::config::{MIN_OVERFETCH, Settings};
use crate::corpus::{Chunk, Corpus};
use crate::embedding::{EmbeddingGateway, create_generator};
use crate::fingerprint::Fingerprint;
use crate::vector::{FlatIndex, RowId, VectorDimension, VectorIndex};

/// Progress updates during a sync or rebuild pass.
#[derive(Debug, Clone)]
pub enum SyncProgress<'a> {
    /// Reading and chunking a document
    Document {
        current: usize,
        total: usize,
        id: &'a str,
    },
    /// Embedding a batch of new chunks
    Embedding { chunks: usize },
    /// A batch was appended (and, for sync, persisted)
    Committed { added: usize, total_rows: usize },
}

/// Counters from a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Rows appended.
    pub added: usize,
    /// Chunks whose fingerprint was already indexed.
    pub skipped: usize,
    /// Chunks that could not be read or embedded. Retried next pass.
    pub failed: usize,
    /// Blank chunks, never embedded.
    pub empty: usize,
    /// Number of times the pair was written to disk.
    pub persisted_batches: usize,
    /// Rows in the index after the pass.
    pub total_rows: usize,
}

/// Counters from a compaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactReport {
    pub retained: usize,
    pub removed: usize,
}

/// Snapshot of index contents.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub rows: usize,
    pub dimension: usize,
    pub model_id: String,
    pub countries: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
    pub index_dir: PathBuf,
    pub blob_path: PathBuf,
    pub sidecar_path: PathBuf,
}

/// Tunables taken from settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Staged chunks per append-and-persist step.
    pub persist_every: usize,
    /// Maximum characters of chunk text kept in metadata.
    pub preview_chars: usize,
    /// Candidates requested per wanted result. Never below 5.
    pub overfetch: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            persist_every: 64,
            preview_chars: 1000,
            overfetch: MIN_OVERFETCH,
        }
    }
}

impl IndexOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            persist_every: settings.sync.persist_every.max(1),
            preview_chars: settings.search.preview_chars,
            overfetch: settings.search.effective_overfetch(),
        }
    }
}

#[derive(Debug)]
struct IndexState {
    vectors: FlatIndex,
    metadata: Vec<EntryMetadata>,
}

impl IndexState {
    fn empty(dimension: VectorDimension) -> Self {
        Self {
            vectors: FlatIndex::new(dimension),
            metadata: Vec::new(),
        }
    }

    fn fingerprints(&self) -> HashSet<Fingerprint> {
        self.metadata.iter().map(|m| m.fingerprint.clone()).collect()
    }

    fn append(&mut self, vectors: &[Vec<f32>], records: Vec<EntryMetadata>) -> IndexResult<()> {
        self.vectors.add_batch(vectors)?;
        self.metadata.extend(records);
        Ok(())
    }

    fn truncate(&mut self, rows: usize) {
        self.vectors.truncate(rows);
        self.metadata.truncate(rows);
    }
}

/// Persistent, incrementally updated similarity index over a corpus.
pub struct KnowledgeIndex {
    paths: IndexPaths,
    gateway: EmbeddingGateway,
    options: IndexOptions,
    writer: Mutex<()>,
    state: RwLock<IndexState>,
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("paths", &self.paths)
            .field("gateway", &self.gateway)
            .field("options", &self.options)
            .field("rows", &self.len())
            .finish()
    }
}

impl KnowledgeIndex {
    /// Open the index stored in `dir`, or start empty if nothing is there.
    ///
    /// Fails with `IndexCorrupt` when the stored pair is inconsistent and
    /// `IncompatibleIndex` when it was built by another model.
    pub fn open(
        dir: impl Into<PathBuf>,
        gateway: EmbeddingGateway,
        options: IndexOptions,
    ) -> IndexResult<Self> {
        let paths = IndexPaths::new(dir);
        let state = match load_pair(&paths, gateway.dimension(), gateway.model_id())? {
            Some(persisted) => IndexState {
                vectors: persisted.vectors,
                metadata: persisted.metadata,
            },
            None => IndexState::empty(gateway.dimension()),
        };

        tracing::info!(
            target: "sync",
            "opened index at {} with {} rows ({})",
            paths.dir.display(),
            state.metadata.len(),
            gateway.model_id()
        );

        Ok(Self::with_state(paths, gateway, options, state))
    }

    /// Start empty without reading what is on disk.
    ///
    /// The next sync or rebuild overwrites the stored pair. This is the way
    /// out of `IndexCorrupt`.
    pub fn fresh(dir: impl Into<PathBuf>, gateway: EmbeddingGateway, options: IndexOptions) -> Self {
        let state = IndexState::empty(gateway.dimension());
        Self::with_state(IndexPaths::new(dir), gateway, options, state)
    }

    /// Open using the configured embedder and index location.
    pub fn from_settings(settings: &Settings) -> IndexResult<Self> {
        let gateway = gateway_from_settings(settings)?;
        Self::open(
            settings.resolved_index_path(),
            gateway,
            IndexOptions::from_settings(settings),
        )
    }

    /// Like `from_settings`, but ignoring any stored pair.
    pub fn fresh_from_settings(settings: &Settings) -> IndexResult<Self> {
        let gateway = gateway_from_settings(settings)?;
        Ok(Self::fresh(
            settings.resolved_index_path(),
            gateway,
            IndexOptions::from_settings(settings),
        ))
    }

    fn with_state(
        paths: IndexPaths,
        gateway: EmbeddingGateway,
        options: IndexOptions,
        state: IndexState,
    ) -> Self {
        Self {
            paths,
            gateway,
            options,
            writer: Mutex::new(()),
            state: RwLock::new(state),
        }
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn dir(&self) -> &Path {
        &self.paths.dir
    }

    pub fn dimension(&self) -> VectorDimension {
        self.gateway.dimension()
    }

    pub fn model_id(&self) -> &str {
        self.gateway.model_id()
    }

    /// Number of committed rows.
    pub fn len(&self) -> usize {
        self.state.read().metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata of every row, in row order.
    pub fn entries(&self) -> Vec<EntryMetadata> {
        self.state.read().metadata.clone()
    }

    /// Stored vector of a row.
    pub fn vector(&self, row: RowId) -> Option<Vec<f32>> {
        self.state.read().vectors.vector(row).map(<[f32]>::to_vec)
    }

    /// Embed and append every chunk whose content is not yet indexed.
    pub fn sync(&self, corpus: &dyn Corpus) -> IndexResult<SyncReport> {
        self.sync_with_progress(corpus, |_| {})
    }

    /// Sync with a progress callback.
    ///
    /// Existing rows are never modified. Every `persist_every` staged chunks
    /// the new rows are appended and the pair is persisted; if persisting
    /// fails the append is rolled back and the error returned.
    pub fn sync_with_progress<F>(&self, corpus: &dyn Corpus, on_progress: F) -> IndexResult<SyncReport>
    where
        F: FnMut(SyncProgress<'_>),
    {
        let _writer = self.writer.lock();
        let seen = self.state.read().fingerprints();

        let report = self.run_pass(corpus, seen, on_progress, |vectors, records| {
            self.commit(vectors, records)
        })?;

        tracing::info!(
            target: "sync",
            "sync complete: {} added, {} skipped, {} failed, {} empty, {} rows",
            report.added,
            report.skipped,
            report.failed,
            report.empty,
            report.total_rows
        );
        Ok(report)
    }

    /// Scan the corpus, embed unseen chunks and hand each batch to `commit`.
    fn run_pass<F, C>(
        &self,
        corpus: &dyn Corpus,
        mut seen: HashSet<Fingerprint>,
        mut on_progress: F,
        mut commit: C,
    ) -> IndexResult<SyncReport>
    where
        F: FnMut(SyncProgress<'_>),
        C: FnMut(Vec<Vec<f32>>, Vec<EntryMetadata>) -> IndexResult<usize>,
    {
        let documents = corpus.documents()?;
        let total = documents.len();
        let mut report = SyncReport {
            total_rows: self.len(),
            ..Default::default()
        };
        let mut pending: Vec<Chunk> = Vec::new();

        for (idx, document) in documents.iter().enumerate() {
            on_progress(SyncProgress::Document {
                current: idx + 1,
                total,
                id: &document.id,
            });

            let chunks = match corpus.load(document) {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::warn!(target: "sync", "skipping {}: {e}", document.id);
                    report.failed += 1;
                    continue;
                }
            };

            for chunk in chunks {
                if seen.contains(&chunk.fingerprint) {
                    report.skipped += 1;
                    continue;
                }
                if chunk.is_blank() {
                    report.empty += 1;
                    continue;
                }
                seen.insert(chunk.fingerprint.clone());
                pending.push(chunk);

                if pending.len() >= self.options.persist_every {
                    self.flush(&mut pending, &mut seen, &mut report, &mut on_progress, &mut commit)?;
                }
            }
        }

        self.flush(&mut pending, &mut seen, &mut report, &mut on_progress, &mut commit)?;
        Ok(report)
    }

    fn flush<F, C>(
        &self,
        pending: &mut Vec<Chunk>,
        seen: &mut HashSet<Fingerprint>,
        report: &mut SyncReport,
        on_progress: &mut F,
        commit: &mut C,
    ) -> IndexResult<()>
    where
        F: FnMut(SyncProgress<'_>),
        C: FnMut(Vec<Vec<f32>>, Vec<EntryMetadata>) -> IndexResult<usize>,
    {
        if pending.is_empty() {
            return Ok(());
        }

        on_progress(SyncProgress::Embedding {
            chunks: pending.len(),
        });

        let texts: Vec<&str> = pending.iter().map(|c| c.content.as_str()).collect();
        let outcomes = self.gateway.embed_batch(&texts);
        let indexed_at = utc_timestamp();

        let mut vectors = Vec::with_capacity(pending.len());
        let mut records = Vec::with_capacity(pending.len());
        for (chunk, outcome) in pending.drain(..).zip(outcomes) {
            match outcome {
                Ok(vector) => {
                    vectors.push(vector);
                    records.push(EntryMetadata::from_chunk(
                        &chunk,
                        self.options.preview_chars,
                        indexed_at,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "sync",
                        "embedding failed for {} ({}): {e}",
                        chunk.id,
                        chunk.fingerprint.short()
                    );
                    seen.remove(&chunk.fingerprint);
                    report.failed += 1;
                }
            }
        }

        if vectors.is_empty() {
            return Ok(());
        }

        let added = vectors.len();
        report.total_rows = commit(vectors, records)?;
        report.added += added;
        report.persisted_batches += 1;

        on_progress(SyncProgress::Committed {
            added,
            total_rows: report.total_rows,
        });
        Ok(())
    }

    /// Append one batch to the live state and persist it.
    fn commit(&self, vectors: Vec<Vec<f32>>, records: Vec<EntryMetadata>) -> IndexResult<usize> {
        let mut state = self.state.write();
        let before = state.metadata.len();

        state.append(&vectors, records)?;

        if let Err(e) = save_pair(&self.paths, &state.vectors, self.model_id(), &state.metadata) {
            tracing::error!(target: "persist", "persist failed, rolling back to {before} rows: {e}");
            state.truncate(before);
            return Err(e.into());
        }

        Ok(state.metadata.len())
    }

    /// Top `k` chunks for `query`, optionally restricted by country and category.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        country: Option<&str>,
        category: Option<&str>,
    ) -> IndexResult<SearchOutcome> {
        self.search_filtered(query, k, &SearchFilter::new(country, category))
    }

    /// Over-fetch `k * overfetch` neighbours, filter locally, keep the first `k`.
    ///
    /// There is no unfiltered fallback: if every candidate is filtered out the
    /// outcome is `NoMatches`.
    pub fn search_filtered(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> IndexResult<SearchOutcome> {
        if k == 0 {
            return Err(IndexError::InvalidQuery("limit must be at least 1".to_string()));
        }
        if query.trim().is_empty() {
            return Err(IndexError::InvalidQuery("query is empty".to_string()));
        }
        if self.is_empty() {
            return Ok(SearchOutcome::EmptyKnowledgeBase);
        }

        let query_vector = self.gateway.embed(query)?;

        let state = self.state.read();
        let rows = state.vectors.count();
        if rows == 0 {
            return Ok(SearchOutcome::EmptyKnowledgeBase);
        }

        let fetch = k
            .saturating_mul(self.options.overfetch.max(MIN_OVERFETCH))
            .min(rows);
        let candidates = state.vectors.search(&query_vector, fetch)?;
        let considered = candidates.len();

        let hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|(row, score)| {
                let entry = state.metadata.get(row.get())?;
                filter
                    .accepts(entry)
                    .then(|| SearchHit::new(row, score, entry))
            })
            .take(k)
            .collect();

        tracing::debug!(
            target: "search",
            "query matched {} of {considered} candidates (k={k}, filter={filter:?})",
            hits.len()
        );

        if hits.is_empty() {
            Ok(SearchOutcome::NoMatches)
        } else {
            Ok(SearchOutcome::Matches(hits))
        }
    }

    /// Row counts and tag breakdown.
    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let mut countries = BTreeMap::new();
        let mut categories = BTreeMap::new();
        for entry in &state.metadata {
            *countries.entry(entry.country.clone()).or_insert(0) += 1;
            *categories.entry(entry.category.clone()).or_insert(0) += 1;
        }

        IndexStats {
            rows: state.metadata.len(),
            dimension: self.dimension().get(),
            model_id: self.model_id().to_string(),
            countries,
            categories,
            index_dir: self.paths.dir.clone(),
            blob_path: self.paths.blob.clone(),
            sidecar_path: self.paths.sidecar.clone(),
        }
    }

    /// Re-read the stored pair and check it is intact.
    ///
    /// Returns the number of rows on disk.
    pub fn verify(&self) -> IndexResult<usize> {
        let rows = load_pair(&self.paths, self.dimension(), self.model_id())?
            .map(|persisted| persisted.metadata.len())
            .unwrap_or(0);

        tracing::info!(
            target: "persist",
            "verified {} rows at {}",
            rows,
            self.paths.dir.display()
        );
        Ok(rows)
    }

    /// Drop rows whose content no longer appears in the corpus.
    ///
    /// Surviving vectors are copied, not re-embedded, and keep their relative
    /// order. Rows belonging to a document that could not be read are kept.
    pub fn compact(&self, corpus: &dyn Corpus) -> IndexResult<CompactReport> {
        let _writer = self.writer.lock();

        let documents = corpus.documents()?;
        let mut live: HashSet<Fingerprint> = HashSet::new();
        let mut unreadable: Vec<String> = Vec::new();
        for document in &documents {
            match corpus.load(document) {
                Ok(chunks) => live.extend(chunks.into_iter().map(|c| c.fingerprint)),
                Err(e) => {
                    tracing::warn!(
                        target: "sync",
                        "keeping rows of unreadable document {}: {e}",
                        document.id
                    );
                    unreadable.push(document.id.clone());
                }
            }
        }

        let (replacement, report) = {
            let state = self.state.read();
            let dimension = state.vectors.dimension();
            let mut data = Vec::new();
            let mut metadata = Vec::new();

            for (row, entry) in state.metadata.iter().enumerate() {
                let keep = live.contains(&entry.fingerprint)
                    || unreadable.iter().any(|doc| belongs_to(&entry.id, doc));
                if !keep {
                    continue;
                }
                let vector = state.vectors.vector(RowId::new(row)).ok_or_else(|| {
                    IndexError::IndexCorrupt {
                        path: self.paths.dir.clone(),
                        reason: format!("metadata row {row} has no vector"),
                    }
                })?;
                data.extend_from_slice(vector);
                metadata.push(entry.clone());
            }

            let report = CompactReport {
                retained: metadata.len(),
                removed: state.metadata.len() - metadata.len(),
            };
            let replacement = IndexState {
                vectors: FlatIndex::from_raw(dimension, data)?,
                metadata,
            };
            (replacement, report)
        };

        if report.removed > 0 {
            save_pair(
                &self.paths,
                &replacement.vectors,
                self.model_id(),
                &replacement.metadata,
            )?;
            *self.state.write() = replacement;
        }

        tracing::info!(
            target: "sync",
            "compaction kept {} rows, removed {}",
            report.retained,
            report.removed
        );
        Ok(report)
    }

    /// Re-embed the whole corpus into a new index and swap it in.
    pub fn rebuild(&self, corpus: &dyn Corpus) -> IndexResult<SyncReport> {
        self.rebuild_with_progress(corpus, |_| {})
    }

    /// Rebuild with a progress callback.
    ///
    /// Searches keep seeing the old rows until the new pair is on disk.
    pub fn rebuild_with_progress<F>(
        &self,
        corpus: &dyn Corpus,
        on_progress: F,
    ) -> IndexResult<SyncReport>
    where
        F: FnMut(SyncProgress<'_>),
    {
        let _writer = self.writer.lock();
        let mut staging = IndexState::empty(self.dimension());

        let mut report = self.run_pass(corpus, HashSet::new(), on_progress, |vectors, records| {
            staging.append(&vectors, records)?;
            Ok(staging.metadata.len())
        })?;

        save_pair(&self.paths, &staging.vectors, self.model_id(), &staging.metadata)?;
        report.total_rows = staging.metadata.len();
        report.persisted_batches = 1;
        *self.state.write() = staging;

        tracing::info!(
            target: "sync",
            "rebuild complete: {} rows, {} failed, {} empty",
            report.total_rows,
            report.failed,
            report.empty
        );
        Ok(report)
    }
}

/// Whether a chunk id was produced from document `doc`, or from a document
/// below `doc` when it names a directory that could not be listed.
fn belongs_to(chunk_id: &str, doc: &str) -> bool {
    chunk_id
        .strip_prefix(doc)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('#') || rest.starts_with('/'))
}

fn gateway_from_settings(settings: &Settings) -> IndexResult<EmbeddingGateway> {
    let generator = create_generator(&settings.embedding)?;
    Ok(EmbeddingGateway::new(generator, settings.embedding.batch_size))
}
