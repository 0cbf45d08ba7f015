use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use fit_journal_core::sync::{entries_to_sync, AppendSummary};
use fit_journal_core::{
    Entry, EntryForm, FileBackend, FitnessTracker, JournalStore, MemoryBackend, RemoteError,
    RemoteRow, SettingKey, SettingValue, SheetsConfig, SheetsRemote, StoreError, SyncOutcome,
    Theme, UpsertOutcome,
};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
struct Sheet {
    rows: Vec<Vec<String>>,
    batches: usize,
    fail_sign_out: bool,
}

#[derive(Clone, Default)]
struct FakeSheets(Arc<Mutex<Sheet>>);

#[async_trait]
impl SheetsRemote for FakeSheets {
    fn is_ready(&self) -> bool {
        true
    }

    async fn initialize(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn is_signed_in(&self) -> bool {
        true
    }

    async fn sign_in(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if self.0.lock().unwrap().fail_sign_out {
            Err(RemoteError::Network("offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn read_rows(&self, _: &str, _: &str) -> Result<Vec<Vec<String>>, RemoteError> {
        tokio::task::yield_now().await;
        Ok(self.0.lock().unwrap().rows.clone())
    }

    async fn append_rows(
        &self,
        _: &str,
        _: &str,
        rows: &[RemoteRow],
    ) -> Result<AppendSummary, RemoteError> {
        tokio::task::yield_now().await;
        let mut sheet = self.0.lock().unwrap();
        sheet.batches += 1;
        sheet
            .rows
            .extend(rows.iter().map(|r| vec![r.date.to_string()]));
        Ok(AppendSummary {
            updated_rows: rows.len(),
        })
    }
}

fn config() -> SheetsConfig {
    SheetsConfig {
        api_key: Some("key".to_string()),
        client_id: Some("client".to_string()),
        client_secret: None,
        spreadsheet_id: Some("sheet".to_string()),
        range: None,
    }
}

fn form(date: &str, weight: &str) -> EntryForm {
    EntryForm {
        date: Some(date.to_string()),
        weight: Some(weight.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn resubmitting_a_date_replaces_the_entry() {
    let store = JournalStore::load(MemoryBackend::new()).into_shared();
    let tracker = FitnessTracker::new(store, FakeSheets::default(), config());

    let first = tracker.submit_entry(form("2024-03-01", "80.5")).await.unwrap();
    let second = tracker.submit_entry(form("2024-03-01", "79.9")).await.unwrap();

    assert_eq!(first.outcome, UpsertOutcome::Inserted);
    assert_eq!(second.outcome, UpsertOutcome::Updated);
    let entries = tracker.list_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].weight, Some(79.9));
}

#[test]
fn journal_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileBackend::new(temp_dir.path().join("data"));

    let mut store = JournalStore::load(backend.clone());
    store
        .upsert_entry(
            Entry::new(date(2024, 1, 2))
                .with_weight(81.0)
                .with_waist(33.5)
                .with_calories(2300)
                .with_protein(160)
                .with_mood("Good")
                .with_phase("Maintenance")
                .with_training_notes("Rest day"),
        )
        .unwrap();
    store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
    store
        .set_setting(SettingKey::Theme, SettingValue::Theme(Theme::Light))
        .unwrap();

    let restarted = JournalStore::load(backend);
    assert_eq!(restarted.journal(), store.journal());
    assert_eq!(restarted.list_entries()[0].date, date(2024, 1, 2));
    assert!(!restarted.is_sync_pending());
}

#[test]
fn diff_selects_only_missing_dates() {
    let entries = vec![
        Entry::new(date(2024, 1, 3)),
        Entry::new(date(2024, 1, 2)),
        Entry::new(date(2024, 1, 1)),
    ];
    let rows = vec![
        vec!["2024-01-01".to_string()],
        vec!["2024-01-02".to_string()],
    ];

    let pending = entries_to_sync(&entries, &rows);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].date, date(2024, 1, 3));
}

#[tokio::test]
async fn overlapping_syncs_write_one_batch() {
    let sheets = FakeSheets::default();
    let store = JournalStore::load(MemoryBackend::new()).into_shared();
    let tracker = FitnessTracker::new(store, sheets.clone(), config());
    tracker.request_connect().await.unwrap();
    tracker.submit_entry(form("2024-01-01", "80")).await.unwrap();
    tracker.submit_entry(form("2024-01-02", "79.5")).await.unwrap();

    let (a, b) = tokio::join!(tracker.request_sync(), tracker.request_sync());

    let outcomes = [a.unwrap(), b.unwrap()];
    assert!(outcomes.contains(&SyncOutcome::Synced { rows_written: 2 }));
    assert!(outcomes.contains(&SyncOutcome::AlreadyRunning));
    assert_eq!(sheets.0.lock().unwrap().batches, 1);
}

#[tokio::test]
async fn disconnect_clears_flag_when_sign_out_fails() {
    let sheets = FakeSheets::default();
    let store = JournalStore::load(MemoryBackend::new()).into_shared();
    let tracker = FitnessTracker::new(store.clone(), sheets.clone(), config());
    tracker.request_connect().await.unwrap();
    assert!(store.lock().await.settings().google_sheets_connected);

    sheets.0.lock().unwrap().fail_sign_out = true;
    let report = tracker.request_disconnect().await;

    assert!(!report.remote_signed_out);
    assert!(!store.lock().await.settings().google_sheets_connected);
}

#[test]
fn exported_snapshot_imports_to_same_state() {
    let mut store = JournalStore::load(MemoryBackend::new());
    store
        .upsert_entry(Entry::new(date(2024, 2, 1)).with_weight(82.25))
        .unwrap();
    store
        .set_setting(SettingKey::AutoSync, SettingValue::Bool(true))
        .unwrap();

    let snapshot = store.export_snapshot().unwrap();
    let imported = JournalStore::load(MemoryBackend::with_contents(snapshot));

    assert_eq!(imported.journal(), store.journal());
}

#[test]
fn quota_failure_keeps_entry_in_memory() {
    let backend = MemoryBackend::new();
    let mut store = JournalStore::load(backend.clone());
    backend.set_fail_writes(true);

    let result = store.upsert_entry(Entry::new(date(2024, 4, 1)).with_weight(78.0));

    assert!(matches!(result, Err(StoreError::Persistence(_))));
    assert_eq!(store.list_entries().len(), 1);
    assert!(store.is_degraded());
    assert!(backend.contents().is_none());
}
