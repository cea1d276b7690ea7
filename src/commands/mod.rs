//! CLI command handlers.

mod collect;
mod config;
mod enrich;
mod export;
mod merge;
mod outreach;
mod presets;
mod progress;
mod scan;
mod sync;

pub use collect::run_collect_command;
pub use config::run_config_show_command;
pub use enrich::run_enrich_command;
pub use export::run_export_command;
pub use merge::run_merge_command;
pub use outreach::run_outreach_command;
pub use presets::run_presets_command;
pub use scan::run_scan_command;
pub use sync::run_sync_command;

use std::path::PathBuf;

use crate::app_config::{FileConfig, LoadedConfig};

/// Default local store when neither flag nor config names one.
pub(crate) const DEFAULT_SQLITE_PATH: &str = "leadscout.db";
pub(crate) const DEFAULT_SUPABASE_TABLE: &str = "businesses";
pub(crate) const DEFAULT_CITY: &str = "medellin";

/// State shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub loaded: LoadedConfig,
    pub config: FileConfig,
    /// Draw progress bars (stderr is a terminal and not `--quiet`).
    pub show_progress: bool,
}

impl CommandContext {
    #[must_use]
    pub fn new(loaded: LoadedConfig, show_progress: bool) -> Self {
        let config = loaded.file();
        Self {
            loaded,
            config,
            show_progress,
        }
    }

    pub(crate) fn sqlite_path(&self, flag: Option<&PathBuf>) -> PathBuf {
        flag.cloned()
            .or_else(|| self.config.sqlite_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH))
    }
}
