//! The operations the user interface calls into.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::models::{Entry, EntryError, EntryForm, UpsertOutcome};
use crate::storage::JournalBackend;
use crate::store::{SharedStore, StoreError};
use crate::sync::{
    ConnectReport, DisconnectReport, SheetSynchronizer, SheetsConfig, SheetsRemote, SyncError,
    SyncOutcome,
};

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result of submitting the entry form.
#[derive(Debug)]
pub struct Submission {
    pub date: NaiveDate,
    pub outcome: UpsertOutcome,
    /// Set when auto-sync ran. A failed auto-sync does not fail the submission.
    pub auto_sync: Option<Result<SyncOutcome, SyncError>>,
}

/// Journal store and synchronizer behind one handle.
pub struct FitnessTracker<B: JournalBackend, R: SheetsRemote> {
    store: SharedStore<B>,
    sync: SheetSynchronizer<B, R>,
}

impl<B: JournalBackend, R: SheetsRemote> FitnessTracker<B, R> {
    pub fn new(store: SharedStore<B>, remote: R, config: SheetsConfig) -> Self {
        let sync = SheetSynchronizer::new(store.clone(), remote, config);
        Self { store, sync }
    }

    pub fn store(&self) -> &SharedStore<B> {
        &self.store
    }

    pub fn synchronizer(&self) -> &SheetSynchronizer<B, R> {
        &self.sync
    }

    /// Validates and saves the form, then syncs if auto-sync is on and a
    /// spreadsheet is connected.
    pub async fn submit_entry(&self, form: EntryForm) -> Result<Submission, TrackerError> {
        let entry = form.into_entry(Utc::now())?;
        let date = entry.date;

        let (outcome, auto_sync) = {
            let mut store = self.store.lock().await;
            let outcome = store.upsert_entry(entry)?;
            let settings = store.settings();
            (outcome, settings.auto_sync && settings.google_sheets_connected)
        };
        tracing::debug!("Saved entry for {} ({:?})", date, outcome);

        let auto_sync = if auto_sync {
            let result = self.request_sync().await;
            if let Err(e) = &result {
                tracing::warn!("Auto-sync after saving {} failed: {}", date, e);
            }
            Some(result)
        } else {
            None
        };

        Ok(Submission {
            date,
            outcome,
            auto_sync,
        })
    }

    /// Runs a sync, loading the client first if the request was deferred.
    pub async fn request_sync(&self) -> Result<SyncOutcome, SyncError> {
        match self.sync.request_sync().await? {
            SyncOutcome::Deferred => {
                let report = self.sync.load_client().await?;
                report.deferred_sync.unwrap_or(Ok(SyncOutcome::Deferred))
            }
            outcome => Ok(outcome),
        }
    }

    pub async fn request_connect(&self) -> Result<ConnectReport, SyncError> {
        self.sync.connect().await
    }

    pub async fn request_disconnect(&self) -> DisconnectReport {
        self.sync.disconnect().await
    }

    pub async fn list_entries(&self) -> Vec<Entry> {
        self.store.lock().await.list_entries().to_vec()
    }

    pub async fn delete_entry(&self, date: NaiveDate) -> Result<bool, StoreError> {
        self.store.lock().await.delete_entry(date)
    }

    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        self.store.lock().await.clear_all()
    }

    pub async fn export_snapshot(&self) -> Result<String, StoreError> {
        self.store.lock().await.export_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SettingKey, SettingValue};
    use crate::storage::MemoryBackend;
    use crate::store::JournalStore;
    use crate::sync::mock::{test_config, MockRemote};

    fn form(date: &str, weight: &str) -> EntryForm {
        EntryForm {
            date: Some(date.to_string()),
            weight: Some(weight.to_string()),
            ..Default::default()
        }
    }

    fn tracker(remote: MockRemote) -> FitnessTracker<MemoryBackend, MockRemote> {
        let store = JournalStore::load(MemoryBackend::new()).into_shared();
        FitnessTracker::new(store, remote, test_config())
    }

    #[tokio::test]
    async fn test_submit_without_auto_sync() {
        let remote = MockRemote::ready();
        let tracker = tracker(remote.clone());

        let submission = tracker.submit_entry(form("2024-03-01", "80.5")).await.unwrap();

        assert_eq!(submission.outcome, UpsertOutcome::Inserted);
        assert!(submission.auto_sync.is_none());
        assert_eq!(tracker.list_entries().await[0].weight, Some(80.5));
        assert_eq!(remote.with(|s| s.reads), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_form() {
        let tracker = tracker(MockRemote::ready());
        let err = tracker
            .submit_entry(form("03/01/2024", "80"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Entry(EntryError::InvalidDate(_))));
        assert!(tracker.list_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_auto_syncs_when_connected() {
        let remote = MockRemote::ready();
        let tracker = tracker(remote.clone());
        tracker.request_connect().await.unwrap();
        tracker
            .store()
            .lock()
            .await
            .set_setting(SettingKey::AutoSync, SettingValue::Bool(true))
            .unwrap();

        let submission = tracker.submit_entry(form("2024-03-01", "80.5")).await.unwrap();

        assert!(matches!(
            submission.auto_sync,
            Some(Ok(SyncOutcome::Synced { rows_written: 1 }))
        ));
        assert!(!tracker.store().lock().await.is_sync_pending());
    }

    #[tokio::test]
    async fn test_failed_auto_sync_keeps_entry() {
        let remote = MockRemote::ready();
        let tracker = tracker(remote.clone());
        tracker.request_connect().await.unwrap();
        tracker
            .store()
            .lock()
            .await
            .set_setting(SettingKey::AutoSync, SettingValue::Bool(true))
            .unwrap();
        remote.with(|s| s.fail_reads = true);

        let submission = tracker.submit_entry(form("2024-03-02", "79.9")).await.unwrap();

        assert!(matches!(
            submission.auto_sync,
            Some(Err(SyncError::TransientNetwork(_)))
        ));
        assert_eq!(tracker.list_entries().await.len(), 1);
        assert!(tracker.store().lock().await.is_sync_pending());
    }

    #[tokio::test]
    async fn test_request_sync_loads_client_when_deferred() {
        let remote = MockRemote::default();
        let tracker = tracker(remote.clone());
        tracker
            .store()
            .lock()
            .await
            .record_connection("sheet-123", "https://example.test", Utc::now())
            .unwrap();
        tracker.submit_entry(form("2024-03-01", "80")).await.unwrap();

        let outcome = tracker.request_sync().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced { rows_written: 1 });
        assert_eq!(remote.with(|s| s.initializations), 1);
    }

    #[tokio::test]
    async fn test_disconnect_then_sync_is_rejected() {
        let remote = MockRemote::ready();
        let tracker = tracker(remote.clone());
        tracker.request_connect().await.unwrap();

        let report = tracker.request_disconnect().await;
        assert!(report.remote_signed_out);
        assert!(matches!(
            tracker.request_sync().await,
            Err(SyncError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_export_and_clear() {
        let tracker = tracker(MockRemote::ready());
        tracker.submit_entry(form("2024-03-01", "80")).await.unwrap();
        tracker.submit_entry(form("2024-03-02", "79")).await.unwrap();

        let snapshot = tracker.export_snapshot().await.unwrap();
        assert!(snapshot.contains("\"2024-03-02\""));

        assert_eq!(tracker.clear_all().await.unwrap(), 2);
        assert!(tracker.list_entries().await.is_empty());
        assert!(!tracker
            .delete_entry(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap());
    }
}
