//! Google Sheets commands.

use clap::{Args, Subcommand};
use fit_journal_core::sync::HEADER;
use fit_journal_core::{SyncOutcome, SyncPhase, WriteOutcome};

use super::entry::parse_date;
use super::{open_store, open_tracker, runtime};
use crate::config::Config;

/// Mirror the journal to a Google Sheets spreadsheet
#[derive(Args)]
pub struct SheetsCommand {
    #[command(subcommand)]
    command: SheetsSubcommand,
}

#[derive(Subcommand)]
enum SheetsSubcommand {
    /// Sign in with Google and link the configured spreadsheet
    Connect,

    /// Sign out and unlink the spreadsheet
    Disconnect,

    /// Append every entry whose date is not in the spreadsheet yet
    Sync,

    /// Append one day's entry directly, without checking for duplicates
    Push {
        /// Date (YYYY-MM-DD)
        date: String,
    },

    /// Show connection status
    Status,
}

impl SheetsCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SheetsSubcommand::Connect => runtime()?.block_on(connect(config)),
            SheetsSubcommand::Disconnect => runtime()?.block_on(disconnect(config)),
            SheetsSubcommand::Sync => runtime()?.block_on(sync(config)),
            SheetsSubcommand::Push { date } => runtime()?.block_on(push(config, date)),
            SheetsSubcommand::Status => status(config),
        }
    }
}

async fn connect(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker(config);
    let report = tracker.request_connect().await?;

    println!("Connected to Google Sheets.");
    println!("  Spreadsheet: {}", report.spreadsheet_id);
    println!("  URL:         {}", report.sheet_url);
    Ok(())
}

async fn disconnect(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker(config);
    let report = tracker.request_disconnect().await;

    if !report.remote_signed_out {
        eprintln!("Warning: Google sign-out failed; the local session was removed anyway.");
    }
    if !report.persisted {
        eprintln!("Warning: settings could not be saved; run disconnect again to persist.");
    }
    println!("Disconnected from Google Sheets.");
    Ok(())
}

async fn sync(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker(config);
    let mut phases = tracker.synchronizer().subscribe();

    println!("Syncing with Google Sheets...");
    let outcome = tracker.request_sync().await;

    while let Ok(phase) = phases.try_recv() {
        if let Some(label) = phase_label(phase) {
            println!("  {}", label);
        }
    }

    match outcome? {
        SyncOutcome::Synced { rows_written: 0 } => println!("Already up to date."),
        SyncOutcome::Synced { rows_written } => {
            println!("Sync complete: {} new rows.", rows_written)
        }
        SyncOutcome::AlreadyRunning => println!("A sync is already running."),
        SyncOutcome::Deferred => println!("Sheets client not ready; sync will run once it is."),
    }
    Ok(())
}

async fn push(config: &Config, date: &str) -> Result<(), Box<dyn std::error::Error>> {
    let date = parse_date(date)?;
    let tracker = open_tracker(config);
    let entry = tracker
        .store()
        .lock()
        .await
        .entry(date)
        .cloned()
        .ok_or_else(|| format!("No entry for {}", date))?;

    let sync = tracker.synchronizer();
    match sync.request_write(std::slice::from_ref(&entry)).await? {
        WriteOutcome::Written { rows } => println!("Appended {} row for {}", rows, date),
        WriteOutcome::Queued { queued } => {
            println!("Queued {} row(s), loading Sheets client...", queued);
            let report = sync.load_client().await?;
            println!(
                "Flushed queue: {} written, {} failed",
                report.flushed, report.failed
            );
        }
    }
    Ok(())
}

fn status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config);
    let settings = store.settings();

    println!("Google Sheets");
    println!("=============");
    println!();

    match config.sheets.validate() {
        Ok(()) => println!("Configuration: ok"),
        Err(e) => println!("Configuration: {}", e),
    }
    println!("Range:         {}", config.sheets.range());
    println!("Columns:       {}", HEADER.join(", "));
    println!(
        "Connected:     {}",
        if settings.google_sheets_connected { "yes" } else { "no" }
    );
    if !settings.spreadsheet_id.is_empty() {
        println!("Spreadsheet:   {}", settings.spreadsheet_id);
    }
    if !settings.sheet_url.is_empty() {
        println!("URL:           {}", settings.sheet_url);
    }
    match settings.last_sync {
        Some(at) => println!("Last sync:     {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Last sync:     never"),
    }
    println!(
        "Auto-sync:     {}",
        if settings.auto_sync { "on" } else { "off" }
    );
    println!(
        "Token cached:  {}",
        if config.token_path().exists() { "yes" } else { "no" }
    );
    Ok(())
}

fn phase_label(phase: SyncPhase) -> Option<&'static str> {
    match phase {
        SyncPhase::Connecting => Some("Connecting"),
        SyncPhase::Authenticating => Some("Checking Google session"),
        SyncPhase::ReadingRemote => Some("Reading spreadsheet"),
        SyncPhase::Diffing => Some("Comparing dates"),
        SyncPhase::Writing => Some("Appending rows"),
        SyncPhase::Idle | SyncPhase::Settled(_) => None,
    }
}
