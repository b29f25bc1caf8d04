//! Incremental synchronization against a directory corpus.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kbindex::embedding::{EmbeddingError, EmbeddingGateway, EmbeddingGenerator, HashingEmbedder};
use kbindex::index::{IndexOptions, KnowledgeIndex};
use kbindex::{DirectoryCorpus, RowId, VectorDimension};
use tempfile::TempDir;

fn dimension() -> VectorDimension {
    VectorDimension::new(512).unwrap()
}

fn hashing_gateway() -> EmbeddingGateway {
    EmbeddingGateway::new(Box::new(HashingEmbedder::new(dimension())), 16)
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn seed_corpus(root: &Path) {
    write(root, "nl/phd.txt", "PhD funding and scholarships for doctoral candidates");
    write(root, "nl/visa.txt", "Student visa and residence permit requirements");
    write(root, "de/visa.txt", "German national visa application at the embassy");
    write(root, "blank.txt", "   \n\t ");
}

/// Hashing embedder that fails on marked texts while `failing` is set.
struct FlakyEmbedder {
    inner: HashingEmbedder,
    marker: &'static str,
    failing: Arc<AtomicBool>,
}

impl EmbeddingGenerator for FlakyEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.failing.load(Ordering::SeqCst) && texts.iter().any(|t| t.contains(self.marker)) {
            return Err(EmbeddingError::Request("simulated outage".to_string()));
        }
        self.inner.generate_embeddings(texts)
    }

    fn dimension(&self) -> VectorDimension {
        self.inner.dimension()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[test]
fn test_second_sync_adds_nothing() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    seed_corpus(corpus_dir.path());
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();

    let first = index.sync(&corpus).unwrap();
    assert_eq!(first.added, 3);
    assert_eq!(first.empty, 1);
    assert_eq!(first.failed, 0);
    assert_eq!(first.total_rows, 3);

    let second = index.sync(&corpus).unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.persisted_batches, 0);
    assert_eq!(index.len(), 3);
}

#[test]
fn test_reopened_index_remembers_fingerprints() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    seed_corpus(corpus_dir.path());
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    {
        let index =
            KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
                .unwrap();
        index.sync(&corpus).unwrap();
    }

    let reopened =
        KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
            .unwrap();
    assert_eq!(reopened.len(), 3);

    let report = reopened.sync(&corpus).unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(reopened.verify().unwrap(), 3);
}

#[test]
fn test_changing_one_chunk_appends_one_row() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    seed_corpus(corpus_dir.path());
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();
    index.sync(&corpus).unwrap();

    let entries_before = index.entries();
    let vectors_before: Vec<Vec<f32>> = (0..index.len())
        .map(|row| index.vector(RowId::new(row)).unwrap())
        .collect();

    write(
        corpus_dir.path(),
        "nl/visa.txt",
        "Student visa and residence permit requirements, updated for 2025",
    );

    let report = index.sync(&corpus).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(index.len(), 4);

    // Existing rows are untouched, the old version of the file included.
    let entries_after = index.entries();
    assert_eq!(&entries_after[..3], &entries_before[..]);
    for (row, before) in vectors_before.iter().enumerate() {
        assert_eq!(&index.vector(RowId::new(row)).unwrap(), before);
    }
    assert_eq!(entries_after[3].id, "nl/visa.txt");
}

#[test]
fn test_embedding_failure_is_retried_next_pass() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    seed_corpus(corpus_dir.path());
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    let failing = Arc::new(AtomicBool::new(true));
    let generator = FlakyEmbedder {
        inner: HashingEmbedder::new(dimension()),
        marker: "embassy",
        failing: Arc::clone(&failing),
    };
    let gateway = EmbeddingGateway::new(Box::new(generator), 16);
    let index = KnowledgeIndex::open(index_dir.path(), gateway, IndexOptions::default()).unwrap();

    let first = index.sync(&corpus).unwrap();
    assert_eq!(first.added, 2);
    assert_eq!(first.failed, 1);
    assert!(index.entries().iter().all(|e| e.id != "de/visa.txt"));

    failing.store(false, Ordering::SeqCst);

    let second = index.sync(&corpus).unwrap();
    assert_eq!(second.added, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(second.skipped, 2);
    assert!(index.entries().iter().any(|e| e.id == "de/visa.txt"));
}

#[test]
fn test_unreadable_document_counts_as_failed() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    seed_corpus(corpus_dir.path());
    std::fs::write(corpus_dir.path().join("broken.txt"), [0xc3, 0x28, 0xff]).unwrap();
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();
    let report = index.sync(&corpus).unwrap();

    assert_eq!(report.added, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(index.verify().unwrap(), 3);
}

#[test]
fn test_missing_corpus_root_aborts_pass() {
    let index_dir = TempDir::new().unwrap();
    let corpus = DirectoryCorpus::new(index_dir.path().join("does-not-exist"));
    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();

    let err = index.sync(&corpus).unwrap_err();
    assert!(err.is_retryable());
    assert!(index.is_empty());
}

#[test]
fn test_sidecar_tags_reach_metadata() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    write(corpus_dir.path(), "phd.txt", "PhD funding for doctoral research");
    write(
        corpus_dir.path(),
        "phd.json",
        r#"{"country": "Netherlands", "category": "scholarship", "source_url": "https://example.org/phd"}"#,
    );
    let corpus = DirectoryCorpus::new(corpus_dir.path());

    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();
    index.sync(&corpus).unwrap();

    let entry = &index.entries()[0];
    assert_eq!(entry.country, "Netherlands");
    assert_eq!(entry.category, "scholarship");
    assert_eq!(entry.source, "https://example.org/phd");
    assert_eq!(entry.content_type, "text");
}

#[test]
fn test_searches_run_alongside_sync() {
    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    for i in 0..40 {
        write(
            corpus_dir.path(),
            &format!("doc{i:02}.txt"),
            &format!("tuition fee schedule number {i} for international students"),
        );
    }
    let corpus = DirectoryCorpus::new(corpus_dir.path());
    let options = IndexOptions {
        persist_every: 4,
        ..Default::default()
    };
    let index = Arc::new(
        KnowledgeIndex::open(index_dir.path(), hashing_gateway(), options).unwrap(),
    );

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let outcome = index.search("tuition fee", 3, None, None).unwrap();
                    assert!(outcome.hits().len() <= 3);
                    for hit in outcome.hits() {
                        assert!(hit.row.get() < 40);
                        assert!(hit.content.contains("tuition"));
                    }
                }
            })
        })
        .collect();

    let report = index.sync(&corpus).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(report.added, 40);
    assert_eq!(report.persisted_batches, 10);
    assert_eq!(index.len(), 40);
    assert_eq!(index.verify().unwrap(), 40);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let corpus_dir = TempDir::new().unwrap();
    let index_dir = TempDir::new().unwrap();
    write(corpus_dir.path(), "nl/phd.txt", "PhD funding for doctoral research");
    write(corpus_dir.path(), "locked/visa.txt", "Visa rules behind a locked folder");
    let locked = corpus_dir.path().join("locked");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop root.
    if std::fs::read_dir(&locked).is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let corpus = DirectoryCorpus::new(corpus_dir.path());
    let index = KnowledgeIndex::open(index_dir.path(), hashing_gateway(), IndexOptions::default())
        .unwrap();
    let report = index.sync(&corpus);
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    let report = report.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(index.entries()[0].id, "nl/phd.txt");
}
