//! Google Sheets synchronization.
//!
//! Local entries are pushed to a spreadsheet that is treated as append-only:
//!
//! 1. Validate configuration (no network access before this passes)
//! 2. Sign in, or reuse the current session
//! 3. Read the configured range and collect the dates already present
//! 4. Append every local entry whose date is missing, in one batch
//! 5. Record `lastSync` and clear the pending flag for the synced revision
//!
//! [`SheetsRemote`] is the seam between the state machine and the service;
//! [`SheetsApi`] implements the REST calls a remote needs.

mod client;
mod config;
mod error;
#[cfg(test)]
pub(crate) mod mock;
mod remote;
mod rows;
mod synchronizer;

pub use client::{SheetsApi, SHEETS_API_URL};
pub use config::{sheet_url, SheetsConfig, DEFAULT_RANGE};
pub use error::{RemoteError, SyncError};
pub use remote::{AppendSummary, SheetsRemote};
pub use rows::{entries_to_sync, existing_dates, parse_sheet_date, RemoteRow, HEADER};
pub use synchronizer::{
    ConnectReport, DisconnectReport, ReadyReport, Settlement, SheetSynchronizer, SyncOutcome,
    SyncPhase, WriteOutcome,
};
