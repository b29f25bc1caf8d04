use clap::Parser;

use kbindex::cli::{self, Cli, Commands};
use kbindex::index::IndexError;
use kbindex::logging;

fn main() {
    let cli = Cli::parse();

    let settings = match cli::load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) if matches!(cli.command, Commands::Init { .. }) => {
            // init must work even when an existing file is broken
            eprintln!("Warning: {e}");
            kbindex::Settings::default()
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    logging::init_with_config(&settings.logging);

    if let Err(e) = cli::run(cli.command, &settings) {
        eprintln!("Error: {e:#}");
        if let Some(hint) = e.downcast_ref::<IndexError>().and_then(IndexError::suggestion) {
            eprintln!("  {hint}");
        }
        std::process::exit(1);
    }
}
