//! CLI module for the `kbi` binary.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use std::path::Path;

use crate::config::{CONFIG_DIR, Settings};
use crate::corpus::DirectoryCorpus;

/// Load settings, from `config` when given or by discovering the workspace.
///
/// A file inside a `.kbindex/` directory makes that directory's parent the
/// workspace root; otherwise relative paths resolve against the current
/// directory.
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let Some(path) = config else {
        return Settings::load().map_err(|e| anyhow::anyhow!("Configuration error: {e}"));
    };

    if !path.is_file() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let mut settings =
        Settings::load_from(path).map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    if settings.workspace_root.is_none() {
        settings.workspace_root = path
            .parent()
            .filter(|dir| dir.file_name().is_some_and(|name| name == CONFIG_DIR))
            .and_then(Path::parent)
            .map(Path::to_path_buf);
    }
    Ok(settings)
}

/// Dispatch a parsed command.
pub fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(settings),
        Commands::Sync { no_progress, json } => commands::sync::run_sync(settings, !no_progress, json),
        Commands::Search {
            query,
            limit,
            country,
            category,
            json,
        } => commands::search::run_search(
            settings,
            &query,
            limit,
            country.as_deref(),
            category.as_deref(),
            json,
        ),
        Commands::Stats { json } => commands::stats::run_stats(settings, json),
        Commands::Verify => commands::maintenance::run_verify(settings),
        Commands::Compact => commands::maintenance::run_compact(settings),
        Commands::Rebuild { no_progress } => {
            commands::maintenance::run_rebuild(settings, !no_progress)
        }
    }
}

/// The corpus described by settings.
pub fn corpus_from_settings(settings: &Settings) -> DirectoryCorpus {
    DirectoryCorpus::from_config(
        settings.resolved_corpus_root(),
        &settings.corpus,
        &settings.chunking,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_parse_search_args() {
        let cli = Cli::try_parse_from([
            "kbi",
            "search",
            "phd funding",
            "--limit",
            "2",
            "--country",
            "Netherlands",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query,
                limit,
                country,
                category,
                json,
            } => {
                assert_eq!(query, "phd funding");
                assert_eq!(limit, Some(2));
                assert_eq!(country.as_deref(), Some("Netherlands"));
                assert!(category.is_none());
                assert!(json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_explicit_config_sets_workspace_root() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("settings.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"hashing\"\ndimension = 32\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.workspace_root.as_deref(), Some(dir.path()));
        assert_eq!(
            settings.resolved_index_path(),
            dir.path().join(".kbindex/index")
        );
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_settings(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
