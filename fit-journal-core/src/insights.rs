//! Read-only summaries over journal entries: dashboard figures, history
//! filtering and trend series.
//!
//! All functions expect entries in journal order (most recent first).

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Entry;

/// Days counted as "this week" on the dashboard, today included.
const WEEK_DAYS: i64 = 7;

/// Headline figures for the most recent entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_entries: usize,
    pub latest_date: Option<NaiveDate>,
    pub current_weight: Option<f64>,
    pub current_waist: Option<f64>,
    pub current_phase: Option<String>,
    /// Latest weight minus the previous entry's weight.
    pub weight_change: Option<f64>,
    /// Latest waist minus the previous entry's waist.
    pub waist_change: Option<f64>,
    /// Number of entries logged under the current phase.
    pub phase_days: usize,
    pub entries_this_week: usize,
}

impl Dashboard {
    pub fn from_entries(entries: &[Entry], today: NaiveDate) -> Self {
        let latest = entries.first();
        let previous = entries.get(1);

        let change = |field: fn(&Entry) -> Option<f64>| match (latest, previous) {
            (Some(a), Some(b)) => Some(field(a)? - field(b)?),
            _ => None,
        };

        let current_phase = latest.and_then(|e| e.phase.clone());
        let phase_days = match &current_phase {
            Some(phase) => entries
                .iter()
                .filter(|e| e.phase.as_ref() == Some(phase))
                .count(),
            None => 0,
        };

        let week_start = today - Duration::days(WEEK_DAYS);
        let entries_this_week = entries.iter().filter(|e| e.date > week_start).count();

        Self {
            total_entries: entries.len(),
            latest_date: latest.map(|e| e.date),
            current_weight: latest.and_then(|e| e.weight),
            current_waist: latest.and_then(|e| e.waist),
            current_phase,
            weight_change: change(|e| e.weight),
            waist_change: change(|e| e.waist),
            phase_days,
            entries_this_week,
        }
    }
}

/// Filters applied to the history view.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Exact phase label to keep.
    pub phase: Option<String>,
    /// Case-insensitive text matched against every rendered field.
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(phase) = &self.phase {
            if entry.phase.as_ref() != Some(phase) {
                return false;
            }
        }
        match &self.search {
            Some(term) if !term.trim().is_empty() => searchable_text(entry)
                .to_lowercase()
                .contains(&term.trim().to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}

fn searchable_text(entry: &Entry) -> String {
    let mut parts = vec![entry.date.to_string()];
    parts.extend(entry.weight.map(|v| v.to_string()));
    parts.extend(entry.waist.map(|v| v.to_string()));
    parts.extend(entry.calories.map(|v| v.to_string()));
    parts.extend(entry.protein.map(|v| v.to_string()));
    parts.extend(entry.mood.clone());
    parts.extend(entry.phase.clone());
    parts.extend(entry.training_notes.clone());
    parts.join(" ")
}

/// Chart-ready series, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub weight: Vec<(NaiveDate, f64)>,
    pub waist: Vec<(NaiveDate, f64)>,
    /// (calories, protein) pairs for days that have both.
    pub nutrition: Vec<(i64, i64)>,
    /// Days logged per phase label.
    pub phase_days: BTreeMap<String, usize>,
}

impl TrendSeries {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut series = TrendSeries::default();

        for entry in entries.iter().rev().filter(|e| e.has_measurements()) {
            if let Some(weight) = entry.weight {
                series.weight.push((entry.date, weight));
            }
            if let Some(waist) = entry.waist {
                series.waist.push((entry.date, waist));
            }
            if let (Some(calories), Some(protein)) = (entry.calories, entry.protein) {
                series.nutrition.push((calories, protein));
            }
            if let Some(phase) = &entry.phase {
                *series.phase_days.entry(phase.clone()).or_insert(0) += 1;
            }
        }

        series
    }
}
