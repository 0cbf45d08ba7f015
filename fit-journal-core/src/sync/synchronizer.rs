//! Reconciliation of the journal with a remote spreadsheet.
//!
//! A sync run walks [`SyncPhase`] from `Connecting` to `Settled` and back to
//! `Idle`. Rows are only ever appended: a local entry counts as synced once
//! any remote row carries its date.

use chrono::Utc;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

use super::config::{sheet_url, SheetsConfig};
use super::error::{RemoteError, SyncError};
use super::remote::SheetsRemote;
use super::rows::{entries_to_sync, RemoteRow};
use crate::models::Entry;
use crate::storage::JournalBackend;
use crate::store::SharedStore;

const PHASE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Success,
    Error,
}

/// Where a sync (or connect) attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Connecting,
    Authenticating,
    ReadingRemote,
    Diffing,
    Writing,
    Settled(Settlement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The run completed; `rows_written` may be zero.
    Synced { rows_written: usize },
    /// Another run was in flight. Nothing was done.
    AlreadyRunning,
    /// The client is not ready. The run starts once it is.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { rows: usize },
    /// Rows were queued until the client is ready; `queued` is the queue length.
    Queued { queued: usize },
}

/// Result of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub spreadsheet_id: String,
    pub sheet_url: String,
}

/// Result of a disconnect. Local flags are cleared in memory regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectReport {
    pub remote_signed_out: bool,
    pub persisted: bool,
}

/// What happened when the client became ready.
#[derive(Debug)]
pub struct ReadyReport {
    pub flushed: usize,
    pub failed: usize,
    /// Outcome of the sync requested while the client was loading, if any.
    pub deferred_sync: Option<Result<SyncOutcome, SyncError>>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SheetSynchronizer<B: JournalBackend, R: SheetsRemote> {
    store: SharedStore<B>,
    remote: R,
    config: SheetsConfig,
    in_flight: AtomicBool,
    deferred: AtomicBool,
    queue: Mutex<VecDeque<RemoteRow>>,
    phase: Mutex<SyncPhase>,
    phases: broadcast::Sender<SyncPhase>,
}

impl<B: JournalBackend, R: SheetsRemote> SheetSynchronizer<B, R> {
    pub fn new(store: SharedStore<B>, remote: R, config: SheetsConfig) -> Self {
        let (phases, _) = broadcast::channel(PHASE_CAPACITY);
        Self {
            store,
            remote,
            config,
            in_flight: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
            phase: Mutex::new(SyncPhase::Idle),
            phases,
        }
    }

    pub fn store(&self) -> &SharedStore<B> {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receives every phase transition, including `Settled`.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncPhase> {
        self.phases.subscribe()
    }

    /// Number of rows waiting for the client to become ready.
    pub fn queued_rows(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_sync_deferred(&self) -> bool {
        self.deferred.load(Ordering::Acquire)
    }

    /// Pushes every local entry missing from the spreadsheet.
    ///
    /// Returns `AlreadyRunning` without touching the remote if a run is in
    /// flight. On failure the journal stays pending and nothing local is
    /// rolled back.
    pub async fn request_sync(&self) -> Result<SyncOutcome, SyncError> {
        self.config.validate()?;
        let spreadsheet_id = self.connected_spreadsheet_id().await?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync already in flight, ignoring request");
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.set_phase(SyncPhase::Connecting);
        if !self.remote.is_ready() {
            tracing::info!("Sheets client not ready, sync deferred");
            self.deferred.store(true, Ordering::Release);
            self.set_phase(SyncPhase::Idle);
            return Ok(SyncOutcome::Deferred);
        }

        let result = self.run_sync(&spreadsheet_id).await;
        match &result {
            Ok(rows_written) => {
                tracing::info!("Sync complete, {} rows written", rows_written);
                self.settle(Settlement::Success);
            }
            Err(e) => {
                tracing::warn!("Sync failed: {}", e);
                self.settle(Settlement::Error);
            }
        }
        result.map(|rows_written| SyncOutcome::Synced { rows_written })
    }

    async fn run_sync(&self, spreadsheet_id: &str) -> Result<usize, SyncError> {
        self.ensure_signed_in().await?;

        let (revision, entries) = {
            let store = self.store.lock().await;
            (store.revision(), store.list_entries().to_vec())
        };

        self.set_phase(SyncPhase::ReadingRemote);
        let remote = &self.remote;
        let range = self.config.range();
        let rows = self
            .retry_once_authenticated(SyncPhase::ReadingRemote, || {
                remote.read_rows(spreadsheet_id, range)
            })
            .await?;

        self.set_phase(SyncPhase::Diffing);
        let pending: Vec<RemoteRow> = entries_to_sync(&entries, &rows)
            .into_iter()
            .map(RemoteRow::from)
            .collect();
        tracing::debug!(
            "{} remote rows, {} local entries, {} to write",
            rows.len(),
            entries.len(),
            pending.len()
        );

        let mut rows_written = 0;
        if !pending.is_empty() {
            self.set_phase(SyncPhase::Writing);
            let summary = self
                .retry_once_authenticated(SyncPhase::Writing, || {
                    remote.append_rows(spreadsheet_id, range, &pending)
                })
                .await?;
            rows_written = summary.updated_rows;
        }

        self.store
            .lock()
            .await
            .record_sync_success(revision, Utc::now())?;
        Ok(rows_written)
    }

    /// Appends `entries` directly, or queues them if the client is not ready.
    pub async fn request_write(&self, entries: &[Entry]) -> Result<WriteOutcome, SyncError> {
        self.config.validate()?;
        let spreadsheet_id = self.connected_spreadsheet_id().await?;
        let rows: Vec<RemoteRow> = entries.iter().map(RemoteRow::from).collect();

        if !self.remote.is_ready() {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.extend(rows);
            tracing::info!("Sheets client not ready, {} rows queued", queue.len());
            return Ok(WriteOutcome::Queued {
                queued: queue.len(),
            });
        }
        if self.queued_rows() > 0 {
            // Rows queued before the client became ready go out first.
            let mut report = ReadyReport {
                flushed: 0,
                failed: 0,
                deferred_sync: None,
            };
            self.flush_queue(&spreadsheet_id, &mut report).await;
        }
        if rows.is_empty() {
            return Ok(WriteOutcome::Written { rows: 0 });
        }

        self.ensure_signed_in().await?;
        let remote = &self.remote;
        let range = self.config.range();
        let summary = self
            .retry_once_authenticated(SyncPhase::Writing, || {
                remote.append_rows(&spreadsheet_id, range, &rows)
            })
            .await?;
        Ok(WriteOutcome::Written {
            rows: summary.updated_rows,
        })
    }

    /// Initializes the remote client if needed, then runs the ready hook.
    pub async fn load_client(&self) -> Result<ReadyReport, SyncError> {
        if !self.remote.is_ready() {
            self.config.validate()?;
            tracing::debug!("Initializing Sheets client");
            self.remote.initialize().await?;
        }
        Ok(self.on_client_ready().await)
    }

    /// Flushes queued rows one append call each, oldest first, then runs a
    /// sync that was deferred while the client was loading.
    ///
    /// A row that fails to write is dropped; the next full sync re-diffs
    /// against the spreadsheet and picks its entry up again.
    pub async fn on_client_ready(&self) -> ReadyReport {
        let mut report = ReadyReport {
            flushed: 0,
            failed: 0,
            deferred_sync: None,
        };

        if self.queued_rows() > 0 {
            match self.connected_spreadsheet_id().await {
                Ok(spreadsheet_id) => self.flush_queue(&spreadsheet_id, &mut report).await,
                Err(e) => {
                    let dropped = self.clear_queue();
                    tracing::warn!("Dropping {} queued rows: {}", dropped, e);
                    report.failed = dropped;
                }
            }
        }

        if self.deferred.swap(false, Ordering::AcqRel) {
            tracing::debug!("Running deferred sync");
            report.deferred_sync = Some(self.request_sync().await);
        }
        report
    }

    async fn flush_queue(&self, spreadsheet_id: &str, report: &mut ReadyReport) {
        let remote = &self.remote;
        let range = self.config.range();

        loop {
            let next = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(row) = next else {
                break;
            };

            let written = match self.ensure_signed_in().await {
                Ok(()) => {
                    self.retry_once_authenticated(SyncPhase::Writing, || {
                        remote.append_rows(spreadsheet_id, range, std::slice::from_ref(&row))
                    })
                    .await
                }
                Err(e) => Err(e),
            };
            match written {
                Ok(_) => report.flushed += 1,
                Err(e) => {
                    tracing::warn!("Queued row for {} not written: {}", row.date, e);
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            "Flushed queue: {} written, {} failed",
            report.flushed,
            report.failed
        );
    }

    /// Signs in, verifies access with one read and records the connection.
    ///
    /// If this call is what made the client ready, queued rows and a
    /// deferred sync are handled afterwards as in [`Self::on_client_ready`].
    pub async fn connect(&self) -> Result<ConnectReport, SyncError> {
        self.config.validate()?;
        let spreadsheet_id = self.config.spreadsheet_id().to_string();
        let was_ready = self.remote.is_ready();

        let result = self.run_connect(&spreadsheet_id).await;
        match &result {
            Ok(report) => {
                tracing::info!("Connected to spreadsheet {}", report.spreadsheet_id);
                self.settle(Settlement::Success);
            }
            Err(e) => {
                tracing::warn!("Connect failed: {}", e);
                self.settle(Settlement::Error);
            }
        }

        if !was_ready && self.remote.is_ready() {
            let ready = self.on_client_ready().await;
            if ready.flushed + ready.failed > 0 || ready.deferred_sync.is_some() {
                tracing::debug!(
                    "Client ready after connect: {} flushed, {} failed",
                    ready.flushed,
                    ready.failed
                );
            }
        }
        result
    }

    async fn run_connect(&self, spreadsheet_id: &str) -> Result<ConnectReport, SyncError> {
        self.set_phase(SyncPhase::Connecting);
        if !self.remote.is_ready() {
            self.remote.initialize().await?;
        }

        self.ensure_signed_in().await?;

        self.set_phase(SyncPhase::ReadingRemote);
        let remote = &self.remote;
        let range = self.config.range();
        self.retry_once_authenticated(SyncPhase::ReadingRemote, || {
            remote.read_rows(spreadsheet_id, range)
        })
        .await?;

        let url = sheet_url(spreadsheet_id);
        self.store
            .lock()
            .await
            .record_connection(spreadsheet_id, &url, Utc::now())?;

        Ok(ConnectReport {
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_url: url,
        })
    }

    /// Signs out remotely and clears the local connection flags.
    ///
    /// Never fails: a remote sign-out or persistence error is logged and
    /// reported, and the local flags are cleared in memory either way.
    pub async fn disconnect(&self) -> DisconnectReport {
        let remote_signed_out = match self.remote.sign_out().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Remote sign-out failed: {}", e);
                false
            }
        };

        let dropped = self.clear_queue();
        if dropped > 0 {
            tracing::info!("Dropped {} queued rows on disconnect", dropped);
        }
        self.deferred.store(false, Ordering::Release);

        let persisted = match self.store.lock().await.record_disconnection() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Disconnected, but settings were not saved: {}", e);
                false
            }
        };

        DisconnectReport {
            remote_signed_out,
            persisted,
        }
    }

    async fn connected_spreadsheet_id(&self) -> Result<String, SyncError> {
        let store = self.store.lock().await;
        let settings = store.settings();
        if !settings.google_sheets_connected {
            return Err(SyncError::NotConnected);
        }
        if settings.spreadsheet_id.is_empty() {
            Ok(self.config.spreadsheet_id().to_string())
        } else {
            Ok(settings.spreadsheet_id.clone())
        }
    }

    async fn ensure_signed_in(&self) -> Result<(), SyncError> {
        self.set_phase(SyncPhase::Authenticating);
        if !self.remote.is_signed_in().await {
            self.remote.sign_in().await?;
        }
        Ok(())
    }

    /// Runs `op`; if the session has expired, signs in once and retries.
    async fn retry_once_authenticated<T, F, Fut>(
        &self,
        phase: SyncPhase,
        mut op: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        match op().await {
            Err(RemoteError::NotAuthenticated) => {
                tracing::info!("Sheets session expired, signing in again");
                self.set_phase(SyncPhase::Authenticating);
                self.remote.sign_in().await?;
                self.set_phase(phase);
                Ok(op().await?)
            }
            result => Ok(result?),
        }
    }

    fn clear_queue(&self) -> usize {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    fn settle(&self, settlement: Settlement) {
        self.set_phase(SyncPhase::Settled(settlement));
        self.set_phase(SyncPhase::Idle);
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        tracing::debug!("Sync phase: {:?}", phase);
        // No subscribers is fine.
        let _ = self.phases.send(phase);
    }
}
