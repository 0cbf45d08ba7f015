//! The journal store: owner of entries and settings, and their persistence.
//!
//! Every mutation is applied to the in-memory journal first and then the
//! whole journal is written to the backend in a single call. If that write
//! fails the caller gets [`StoreError::Persistence`], but the in-memory
//! journal keeps the change and stays authoritative until the next
//! successful load.
//!
//! Sync bookkeeping (connection records and sync checkpoints) is the
//! exception: it only takes effect once it has been written.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

use crate::models::{
    Entry, Journal, SettingError, SettingKey, SettingValue, Settings, UpsertOutcome,
};
use crate::storage::{JournalBackend, StorageError};

/// Capacity of the change notification channel.
const EVENT_CAPACITY: usize = 64;

/// A store shared between the UI layer and the synchronizer.
pub type SharedStore<B> = Arc<Mutex<JournalStore<B>>>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to persist journal: {0}")]
    Persistence(#[from] StorageError),

    #[error(transparent)]
    Setting(#[from] SettingError),
}

/// Change notifications published after each successful in-memory mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    EntrySaved {
        date: NaiveDate,
        outcome: UpsertOutcome,
    },
    EntryDeleted(NaiveDate),
    EntriesCleared(usize),
    SettingChanged(SettingKey),
}

pub struct JournalStore<B: JournalBackend> {
    backend: B,
    journal: Journal,
    /// Bumped by every user mutation.
    revision: u64,
    /// Revision covered by the last successful sync.
    synced_revision: u64,
    degraded: bool,
    events: broadcast::Sender<StoreEvent>,
}

impl<B: JournalBackend> JournalStore<B> {
    /// Loads the journal from `backend`.
    ///
    /// Never fails: a missing blob yields an empty journal with default
    /// settings, and an unreadable or corrupt blob does the same after
    /// logging a warning.
    pub fn load(backend: B) -> Self {
        let journal = match backend.read() {
            Ok(Some(bytes)) => match serde_json::from_slice::<Journal>(&bytes) {
                Ok(journal) => journal,
                Err(e) => {
                    tracing::warn!("Stored journal is corrupt, starting fresh: {}", e);
                    Journal::new()
                }
            },
            Ok(None) => Journal::new(),
            Err(e) => {
                tracing::warn!("Failed to read stored journal, starting fresh: {}", e);
                Journal::new()
            }
        };
        tracing::debug!("Loaded journal with {} entries", journal.entries().len());

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            journal,
            revision: 0,
            synced_revision: 0,
            degraded: false,
            events,
        }
    }

    /// Wraps the store for sharing with a synchronizer.
    pub fn into_shared(self) -> SharedStore<B> {
        Arc::new(Mutex::new(self))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Entries, most recent first.
    pub fn list_entries(&self) -> &[Entry] {
        self.journal.entries()
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&Entry> {
        self.journal.entry(date)
    }

    pub fn settings(&self) -> &Settings {
        &self.journal.settings
    }

    /// Saves `entry`, replacing any entry with the same date.
    pub fn upsert_entry(&mut self, entry: Entry) -> Result<UpsertOutcome, StoreError> {
        let date = entry.date;
        let outcome = self.journal.upsert(entry);
        self.touch(StoreEvent::EntrySaved { date, outcome });
        self.persist()?;
        Ok(outcome)
    }

    /// Deletes the entry for `date`. Deleting a missing date is a no-op.
    pub fn delete_entry(&mut self, date: NaiveDate) -> Result<bool, StoreError> {
        if !self.journal.remove(date) {
            return Ok(false);
        }
        self.touch(StoreEvent::EntryDeleted(date));
        self.persist()?;
        Ok(true)
    }

    /// Removes every entry but keeps settings. Returns how many were removed.
    pub fn clear_all(&mut self) -> Result<usize, StoreError> {
        let removed = self.journal.clear_entries();
        self.touch(StoreEvent::EntriesCleared(removed));
        self.persist()?;
        Ok(removed)
    }

    /// Returns the setting for `key`, or `default` when it is unset.
    pub fn get_setting(&self, key: SettingKey, default: SettingValue) -> SettingValue {
        self.journal.settings.get_or(key, default)
    }

    pub fn set_setting(&mut self, key: SettingKey, value: SettingValue) -> Result<(), StoreError> {
        self.journal.settings.set(key, value)?;
        self.touch(StoreEvent::SettingChanged(key));
        self.persist()
    }

    /// Serializes the full journal in the same format [`JournalStore::load`] reads.
    pub fn export_snapshot(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.journal)
            .map_err(|e| StoreError::Persistence(StorageError::Serialize(e.to_string())))
    }

    /// True when the journal changed since the last successful sync.
    pub fn is_sync_pending(&self) -> bool {
        self.revision != self.synced_revision
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the most recent write to the backend failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Records a verified connection to a spreadsheet.
    ///
    /// If the write fails the previous settings are restored, so the store
    /// never reports a connection that was not saved.
    pub fn record_connection(
        &mut self,
        spreadsheet_id: &str,
        sheet_url: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let previous = self.journal.settings.clone();
        let settings = &mut self.journal.settings;
        settings.google_sheets_connected = true;
        settings.spreadsheet_id = spreadsheet_id.to_string();
        settings.sheet_url = sheet_url.to_string();
        settings.last_sync = Some(at);

        if let Err(e) = self.persist() {
            self.journal.settings = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Clears the local connection flags.
    pub fn record_disconnection(&mut self) -> Result<(), StoreError> {
        let settings = &mut self.journal.settings;
        settings.google_sheets_connected = false;
        settings.sheet_url.clear();
        settings.spreadsheet_id.clear();
        self.persist()
    }

    /// Marks everything up to `revision` as synced and stamps `lastSync`.
    ///
    /// Changes made after `revision` was read stay pending. If the write
    /// fails nothing is marked and `lastSync` keeps its old value.
    pub fn record_sync_success(
        &mut self,
        revision: u64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let previous = self.journal.settings.last_sync.replace(at);
        if let Err(e) = self.persist() {
            self.journal.settings.last_sync = previous;
            return Err(e);
        }
        self.synced_revision = revision.max(self.synced_revision);
        Ok(())
    }

    fn touch(&mut self, event: StoreEvent) {
        self.revision += 1;
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&self.journal)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;

        match self.backend.write(&bytes) {
            Ok(()) => {
                if self.degraded {
                    tracing::info!("Journal persisted again after earlier failures");
                }
                self.degraded = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Journal write failed, keeping changes in memory: {}", e);
                self.degraded = true;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;
    use crate::storage::{FileBackend, MemoryBackend};
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn memory_store() -> (JournalStore<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        (JournalStore::load(backend.clone()), backend)
    }

    #[test]
    fn test_load_empty_backend() {
        let (store, _) = memory_store();
        assert!(store.list_entries().is_empty());
        assert_eq!(store.settings(), &Settings::default());
        assert!(!store.is_sync_pending());
    }

    #[test]
    fn test_load_corrupt_blob_falls_back_to_defaults() {
        let store = JournalStore::load(MemoryBackend::with_contents("{not json"));
        assert!(store.list_entries().is_empty());
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_upsert_persists_and_marks_pending() {
        let (mut store, backend) = memory_store();
        let outcome = store
            .upsert_entry(Entry::new(date(2024, 3, 1)).with_weight(80.5))
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(backend.write_count(), 1);
        assert!(store.is_sync_pending());

        let reloaded = JournalStore::load(backend);
        assert_eq!(reloaded.list_entries()[0].weight, Some(80.5));
    }

    #[test]
    fn test_delete_missing_date_is_noop() {
        let (mut store, backend) = memory_store();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();

        assert!(!store.delete_entry(date(2020, 1, 1)).unwrap());
        assert_eq!(backend.write_count(), 1);
        assert_eq!(store.list_entries().len(), 1);

        assert!(store.delete_entry(date(2024, 1, 1)).unwrap());
        assert!(store.list_entries().is_empty());
    }

    #[test]
    fn test_persistence_failure_keeps_memory_state() {
        let (mut store, backend) = memory_store();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        backend.set_fail_writes(true);

        let err = store
            .upsert_entry(Entry::new(date(2024, 1, 2)))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Persistence(StorageError::QuotaExceeded)
        ));
        assert_eq!(store.list_entries().len(), 2);
        assert!(store.is_degraded());

        // The backend still holds the last good blob.
        let on_disk = JournalStore::load(backend.clone());
        assert_eq!(on_disk.list_entries().len(), 1);

        backend.set_fail_writes(false);
        store.upsert_entry(Entry::new(date(2024, 1, 3))).unwrap();
        assert!(!store.is_degraded());
        assert_eq!(JournalStore::load(backend).list_entries().len(), 3);
    }

    #[test]
    fn test_settings_accessors() {
        let (mut store, backend) = memory_store();
        assert_eq!(
            store.get_setting(SettingKey::SheetUrl, SettingValue::Text("none".into())),
            SettingValue::Text("none".into())
        );

        store
            .set_setting(SettingKey::Theme, SettingValue::Theme(Theme::Dark))
            .unwrap();
        assert_eq!(backend.write_count(), 1);
        assert!(store.is_sync_pending());

        let err = store
            .set_setting(SettingKey::Theme, SettingValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::Setting(_)));
        assert_eq!(backend.write_count(), 1);

        let reloaded = JournalStore::load(backend);
        assert_eq!(reloaded.settings().theme, Theme::Dark);
    }

    #[test]
    fn test_clear_all_keeps_settings() {
        let (mut store, _) = memory_store();
        store
            .set_setting(SettingKey::AutoSync, SettingValue::Bool(true))
            .unwrap();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        store.upsert_entry(Entry::new(date(2024, 1, 2))).unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list_entries().is_empty());
        assert!(store.settings().auto_sync);
    }

    #[test]
    fn test_export_snapshot_roundtrips_through_load() {
        let (mut store, _) = memory_store();
        store
            .upsert_entry(
                Entry::new(date(2024, 3, 1))
                    .with_weight(80.5)
                    .with_phase("Cutting"),
            )
            .unwrap();
        store
            .set_setting(SettingKey::AutoSync, SettingValue::Bool(true))
            .unwrap();

        let snapshot = store.export_snapshot().unwrap();
        let imported = JournalStore::load(MemoryBackend::with_contents(snapshot));
        assert_eq!(imported.journal(), store.journal());
    }

    #[test]
    fn test_sync_success_only_clears_covered_revision() {
        let (mut store, _) = memory_store();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        let snapshot_revision = store.revision();
        store.upsert_entry(Entry::new(date(2024, 1, 2))).unwrap();

        store
            .record_sync_success(snapshot_revision, Utc::now())
            .unwrap();
        assert!(store.is_sync_pending());
        assert!(store.settings().last_sync.is_some());

        let current = store.revision();
        store.record_sync_success(current, Utc::now()).unwrap();
        assert!(!store.is_sync_pending());
    }

    #[test]
    fn test_failed_sync_checkpoint_keeps_pending() {
        let (mut store, backend) = memory_store();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        backend.set_fail_writes(true);

        let revision = store.revision();
        let err = store.record_sync_success(revision, Utc::now()).unwrap_err();

        assert!(matches!(err, StoreError::Persistence(_)));
        assert!(store.is_sync_pending());
        assert!(store.settings().last_sync.is_none());

        backend.set_fail_writes(false);
        store.record_sync_success(revision, Utc::now()).unwrap();
        assert!(!store.is_sync_pending());
    }

    #[test]
    fn test_failed_connection_record_is_rolled_back() {
        let (mut store, backend) = memory_store();
        backend.set_fail_writes(true);

        assert!(store
            .record_connection("sheet-1", "https://example.test/sheet-1", Utc::now())
            .is_err());

        assert_eq!(store.settings(), &Settings::default());
        assert!(store.is_degraded());
    }

    #[test]
    fn test_weights_survive_reload_exactly() {
        let (mut store, backend) = memory_store();
        store
            .upsert_entry(
                Entry::new(date(2024, 3, 1))
                    .with_weight(117199.23203609463)
                    .with_waist(0.1 + 0.2),
            )
            .unwrap();

        let reloaded = JournalStore::load(backend);
        assert_eq!(reloaded.journal(), store.journal());
        assert_eq!(
            reloaded.list_entries()[0].weight,
            Some(117199.23203609463)
        );
    }

    #[test]
    fn test_connection_records_do_not_mark_pending() {
        let (mut store, _) = memory_store();
        store
            .record_connection("sheet-1", "https://example.test/sheet-1", Utc::now())
            .unwrap();
        assert!(store.settings().google_sheets_connected);
        assert_eq!(store.settings().spreadsheet_id, "sheet-1");
        assert!(!store.is_sync_pending());

        store.record_disconnection().unwrap();
        assert!(!store.settings().google_sheets_connected);
        assert!(store.settings().spreadsheet_id.is_empty());
        assert!(store.settings().sheet_url.is_empty());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let (mut store, _) = memory_store();
        let mut rx = store.subscribe();

        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        store.upsert_entry(Entry::new(date(2024, 1, 1))).unwrap();
        store.delete_entry(date(2024, 1, 1)).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::EntrySaved {
                date: date(2024, 1, 1),
                outcome: UpsertOutcome::Inserted
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::EntrySaved {
                date: date(2024, 1, 1),
                outcome: UpsertOutcome::Updated
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::EntryDeleted(date(2024, 1, 1))
        );
    }

    #[test]
    fn test_file_backed_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().to_path_buf());
        let mut store = JournalStore::load(backend.clone());
        store
            .upsert_entry(Entry::new(date(2024, 2, 1)).with_calories(2200))
            .unwrap();

        let reloaded = JournalStore::load(backend);
        assert_eq!(reloaded.journal(), store.journal());
    }
}
