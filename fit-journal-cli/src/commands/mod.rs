mod config_cmd;
mod dashboard;
mod data;
mod entry;
mod history;
mod settings_cmd;
mod sheets_cmd;

use clap::ValueEnum;
use fit_journal_core::{FileBackend, FitnessTracker, JournalStore};

use crate::config::Config;
use crate::sheets::GoogleSheetsRemote;

pub use config_cmd::ConfigCommand;
pub use dashboard::{DashboardCommand, TrendsCommand};
pub use data::{ClearCommand, ExportCommand};
pub use entry::{DeleteCommand, LogCommand};
pub use history::HistoryCommand;
pub use settings_cmd::SettingsCommand;
pub use sheets_cmd::SheetsCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Opens the journal in the configured data directory.
pub fn open_store(config: &Config) -> JournalStore<FileBackend> {
    JournalStore::load(FileBackend::new(config.data_dir.value.clone()))
}

/// Journal store wired to the Google Sheets remote.
pub fn open_tracker(config: &Config) -> FitnessTracker<FileBackend, GoogleSheetsRemote> {
    let remote = GoogleSheetsRemote::new(&config.sheets, config.token_path());
    FitnessTracker::new(open_store(config).into_shared(), remote, config.sheets.clone())
}

pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e).into())
}
