//! Stats command.

use crate::config::Settings;
use crate::index::KnowledgeIndex;

/// Run stats command - row counts and tag breakdown.
pub fn run_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let index = KnowledgeIndex::from_settings(settings)?;
    let stats = index.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index: {}", stats.index_dir.display());
    println!("  Rows:      {}", stats.rows);
    println!("  Model:     {}", stats.model_id);
    println!("  Dimension: {}", stats.dimension);

    if !stats.countries.is_empty() {
        println!("  Countries:");
        for (country, count) in &stats.countries {
            println!("    {country:<24} {count}");
        }
    }
    if !stats.categories.is_empty() {
        println!("  Categories:");
        for (category, count) in &stats.categories {
            println!("    {category:<24} {count}");
        }
    }
    Ok(())
}
