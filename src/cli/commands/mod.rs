//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod init;
pub mod maintenance;
pub mod search;
pub mod stats;
pub mod sync;

use indicatif::{ProgressBar, ProgressStyle};

use crate::index::SyncProgress;

/// Progress bar driven by sync and rebuild callbacks.
pub(crate) struct SyncBar {
    bar: ProgressBar,
}

impl SyncBar {
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{bar:28.cyan/blue}] {pos}/{len} documents {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉ ");
        bar.set_style(style);
        Self { bar }
    }

    pub(crate) fn update(&self, progress: SyncProgress<'_>) {
        match progress {
            SyncProgress::Document { current, total, id } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(current as u64);
                self.bar.set_message(id.to_string());
            }
            SyncProgress::Embedding { chunks } => {
                self.bar.set_message(format!("embedding {chunks} chunks"));
            }
            SyncProgress::Committed { total_rows, .. } => {
                self.bar.set_message(format!("{total_rows} rows committed"));
            }
        }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
