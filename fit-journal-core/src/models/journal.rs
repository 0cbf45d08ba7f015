use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::entry::Entry;
use super::settings::Settings;

/// Whether an upsert created a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The full journal: dated entries plus settings.
///
/// Entries are unique by date and always ordered most recent first. Both
/// invariants are re-established when a journal is deserialized, so a
/// hand-edited or legacy blob cannot break them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawJournal")]
pub struct Journal {
    entries: Vec<Entry>,
    pub settings: Settings,
}

#[derive(Deserialize)]
struct RawJournal {
    #[serde(default)]
    entries: Vec<Entry>,
    #[serde(default)]
    settings: Settings,
}

impl From<RawJournal> for Journal {
    fn from(raw: RawJournal) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<Entry> = raw
            .entries
            .into_iter()
            .filter(|entry| seen.insert(entry.date))
            .collect();
        sort_descending(&mut entries);

        Self {
            entries,
            settings: raw.settings,
        }
    }
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&Entry> {
        self.entries.iter().find(|e| e.date == date)
    }

    /// Replaces the entry with the same date, or inserts a new one.
    pub fn upsert(&mut self, entry: Entry) -> UpsertOutcome {
        let outcome = match self.entries.iter_mut().find(|e| e.date == entry.date) {
            Some(existing) => {
                *existing = entry;
                UpsertOutcome::Updated
            }
            None => {
                self.entries.push(entry);
                UpsertOutcome::Inserted
            }
        };
        sort_descending(&mut self.entries);
        outcome
    }

    /// Removes the entry for `date`. Returns false if there was none.
    pub fn remove(&mut self, date: NaiveDate) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.date != date);
        self.entries.len() != before
    }

    /// Drops every entry, keeping settings. Returns how many were removed.
    pub fn clear_entries(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

fn sort_descending(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}
