//! Filtered retrieval: over-fetch, local filtering, ordering.

use kbindex::embedding::{EmbeddingGateway, HashingEmbedder};
use kbindex::index::{IndexOptions, KnowledgeIndex, SearchFilter, SearchOutcome};
use kbindex::{Chunk, ChunkTags, MemoryCorpus, VectorDimension};
use tempfile::TempDir;

fn open(dir: &TempDir) -> KnowledgeIndex {
    let gateway = EmbeddingGateway::new(
        Box::new(HashingEmbedder::new(VectorDimension::new(512).unwrap())),
        16,
    );
    KnowledgeIndex::open(dir.path(), gateway, IndexOptions::default()).unwrap()
}

fn scenario() -> MemoryCorpus {
    [
        Chunk::new(
            "nl/scholarship.txt",
            "PhD funding and scholarships for doctoral researchers",
            ChunkTags::new("Netherlands", "scholarship"),
        ),
        Chunk::new(
            "de/visa.txt",
            "Germany student visa: blocked account and embassy appointment",
            ChunkTags::new("Germany", "visa"),
        ),
        Chunk::new(
            "nl/visa.txt",
            "Netherlands residence permit through the university",
            ChunkTags::new("Netherlands", "visa"),
        ),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_netherlands_phd_funding_scenario() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    index.sync(&scenario()).unwrap();

    let outcome = index
        .search("funding for PhD", 3, Some("Netherlands"), None)
        .unwrap();
    let hits = outcome.hits();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "nl/scholarship.txt");
    assert_eq!(hits[1].id, "nl/visa.txt");
    assert!(hits[0].score > hits[1].score);
    assert!(hits.iter().all(|h| h.id != "de/visa.txt"));
    assert!(outcome.render().starts_with("PhD funding"));
}

#[test]
fn test_country_filter_never_leaks() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    index.sync(&scenario()).unwrap();

    for query in ["visa", "embassy appointment", "funding", "residence permit"] {
        let outcome = index.search(query, 5, Some("germany"), None).unwrap();
        for hit in outcome.hits() {
            assert_eq!(hit.country, "Germany");
        }

        let outcome = index.search(query, 5, Some("NETHERLANDS"), Some("visa")).unwrap();
        for hit in outcome.hits() {
            assert_eq!(hit.id, "nl/visa.txt");
        }
    }
}

#[test]
fn test_unmatched_filter_returns_no_matches() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    index.sync(&scenario()).unwrap();

    let outcome = index.search("visa", 3, Some("France"), None).unwrap();
    assert_eq!(outcome, SearchOutcome::NoMatches);
    assert_eq!(outcome.render(), "(no relevant matches)");

    let outcome = index.search("visa", 3, Some("Germany"), Some("scholarship")).unwrap();
    assert_eq!(outcome, SearchOutcome::NoMatches);
}

#[test]
fn test_empty_index_reports_empty_knowledge_base() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    let outcome = index.search("anything", 3, Some("Netherlands"), None).unwrap();
    assert_eq!(outcome, SearchOutcome::EmptyKnowledgeBase);
    assert_eq!(outcome.render(), "(knowledge base empty)");
}

#[test]
fn test_blank_filter_behaves_as_absent() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    index.sync(&scenario()).unwrap();

    let filtered = index.search("visa", 3, Some("  "), Some("")).unwrap();
    let unfiltered = index.search("visa", 3, None, None).unwrap();
    assert_eq!(filtered, unfiltered);
    assert_eq!(unfiltered.hits().len(), 3);
}

#[test]
fn test_equal_scores_keep_insertion_order() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);

    // Same tokens, different bytes: identical vectors, distinct fingerprints.
    let corpus: MemoryCorpus = ["visa rules", "Visa Rules", "VISA RULES", "rules, visa"]
        .iter()
        .enumerate()
        .map(|(i, text)| Chunk::new(format!("c{i}"), *text, ChunkTags::default()))
        .collect();
    let report = index.sync(&corpus).unwrap();
    assert_eq!(report.added, 4);

    let outcome = index.search("visa rules", 4, None, None).unwrap();
    let rows: Vec<usize> = outcome.hits().iter().map(|h| h.row.get()).collect();
    assert_eq!(rows, vec![0, 1, 2, 3]);

    let outcome = index.search("visa rules", 2, None, None).unwrap();
    let ids: Vec<&str> = outcome.hits().iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["c0", "c1"]);
}

#[test]
fn test_overfetch_window_bounds_filtered_results() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);

    let mut chunks: Vec<Chunk> = (0..10)
        .map(|i| {
            Chunk::new(
                format!("de/{i}.txt"),
                format!("visa rules germany {i}"),
                ChunkTags::new("Germany", "visa"),
            )
        })
        .collect();
    chunks.push(Chunk::new(
        "nl/housing.txt",
        "netherlands housing guide mentions visa",
        ChunkTags::new("Netherlands", "general"),
    ));
    index.sync(&chunks.into_iter().collect::<MemoryCorpus>()).unwrap();

    // k = 1 looks at 5 candidates, all German.
    let narrow = index.search("visa rules", 1, Some("Netherlands"), None).unwrap();
    assert_eq!(narrow, SearchOutcome::NoMatches);

    // k = 3 looks at 15 candidates, capped to all 11 rows.
    let wide = index.search("visa rules", 3, Some("Netherlands"), None).unwrap();
    let ids: Vec<&str> = wide.hits().iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["nl/housing.txt"]);
}

#[test]
fn test_results_are_sorted_by_score() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    index.sync(&scenario()).unwrap();

    let outcome = index.search_filtered("visa permit", 3, &SearchFilter::default()).unwrap();
    let scores: Vec<f32> = outcome.hits().iter().map(|h| h.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_punctuation_only_query_and_content() {
    let dir = TempDir::new().unwrap();
    let index = open(&dir);
    let mut corpus = scenario();
    corpus.upsert(Chunk::new("divider.txt", "---", ChunkTags::default()));

    let report = index.sync(&corpus).unwrap();
    assert_eq!(report.added, 4);
    assert_eq!(report.failed, 0);

    let outcome = index.search("???", 2, None, None).unwrap();
    assert!(matches!(outcome, SearchOutcome::Matches(_)));
    assert_eq!(index.sync(&corpus).unwrap().failed, 0);
}
