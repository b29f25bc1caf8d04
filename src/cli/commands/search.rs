//! Search command.

use crate::config::Settings;
use crate::index::{KnowledgeIndex, SearchOutcome};

/// Run search command - filtered similarity search.
pub fn run_search(
    settings: &Settings,
    query: &str,
    limit: Option<usize>,
    country: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let index = KnowledgeIndex::from_settings(settings)?;
    let limit = limit.unwrap_or(settings.search.default_limit);
    let outcome = index.search(query, limit, country, category)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match &outcome {
        SearchOutcome::Matches(hits) => {
            for (i, hit) in hits.iter().enumerate() {
                println!(
                    "\n{}. {} [{} / {}] (score: {:.3})",
                    i + 1,
                    hit.id,
                    hit.country,
                    hit.category,
                    hit.score
                );
                if !hit.source.is_empty() && hit.source != hit.id {
                    println!("   Source: {}", hit.source);
                }
                println!("   {}", hit.content.replace('\n', "\n   "));
            }
        }
        other => eprintln!("{}", other.render()),
    }
    Ok(())
}
