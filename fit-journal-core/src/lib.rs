//! Fit Journal Core Library
//!
//! Daily body-composition and nutrition journal with a local store and
//! Google Sheets synchronization.

pub mod insights;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;
pub mod tracker;

pub use insights::{Dashboard, HistoryFilter, TrendSeries};
pub use models::{
    Entry, EntryError, EntryForm, Journal, SettingError, SettingKey, SettingValue, Settings,
    Theme, UpsertOutcome, DATE_FORMAT,
};
pub use storage::{FileBackend, JournalBackend, MemoryBackend, StorageError};
pub use store::{JournalStore, SharedStore, StoreError, StoreEvent};
pub use sync::{
    ConnectReport, DisconnectReport, RemoteError, RemoteRow, SheetSynchronizer, SheetsApi,
    SheetsConfig, SheetsRemote, SyncError, SyncOutcome, SyncPhase, WriteOutcome,
};
pub use tracker::{FitnessTracker, Submission, TrackerError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
