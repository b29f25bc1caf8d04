//! Verify, compact and rebuild commands.

use crate::cli::corpus_from_settings;
use crate::config::Settings;
use crate::index::KnowledgeIndex;

use super::SyncBar;

/// Run verify command - check the stored pair without keeping it open.
pub fn run_verify(settings: &Settings) -> anyhow::Result<()> {
    let index = KnowledgeIndex::fresh_from_settings(settings)?;
    let rows = index.verify()?;
    println!("Index OK: {rows} rows at {}", index.dir().display());
    Ok(())
}

/// Run compact command - drop rows whose content left the corpus.
pub fn run_compact(settings: &Settings) -> anyhow::Result<()> {
    let index = KnowledgeIndex::from_settings(settings)?;
    let corpus = corpus_from_settings(settings);
    let report = index.compact(&corpus)?;
    println!(
        "Compaction complete: {} rows kept, {} removed",
        report.retained, report.removed
    );
    Ok(())
}

/// Run rebuild command - re-embed everything, ignoring what is on disk.
pub fn run_rebuild(settings: &Settings, progress: bool) -> anyhow::Result<()> {
    let index = KnowledgeIndex::fresh_from_settings(settings)?;
    let corpus = corpus_from_settings(settings);

    let bar = SyncBar::new(progress);
    let result = index.rebuild_with_progress(&corpus, |p| bar.update(p));
    bar.finish();
    let report = result?;

    println!(
        "Rebuild complete: {} rows ({} failed, {} empty)",
        report.total_rows, report.failed, report.empty
    );
    Ok(())
}
