//! Sync command.

use crate::cli::corpus_from_settings;
use crate::config::Settings;
use crate::index::KnowledgeIndex;

use super::SyncBar;

/// Run sync command - embed and persist chunks not yet indexed.
pub fn run_sync(settings: &Settings, progress: bool, json: bool) -> anyhow::Result<()> {
    let index = KnowledgeIndex::from_settings(settings)?;
    let corpus = corpus_from_settings(settings);

    let bar = SyncBar::new(progress && !json);
    let result = index.sync_with_progress(&corpus, |p| bar.update(p));
    bar.finish();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Sync complete");
    println!("  Added:   {}", report.added);
    println!("  Skipped: {}", report.skipped);
    println!("  Failed:  {}", report.failed);
    println!("  Empty:   {}", report.empty);
    println!("  Rows:    {}", report.total_rows);
    if report.failed > 0 {
        eprintln!("{} chunks failed and will be retried on the next sync", report.failed);
    }
    Ok(())
}
