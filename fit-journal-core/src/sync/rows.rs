//! Mapping between journal entries and spreadsheet rows.

use chrono::{Days, NaiveDate};
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{Entry, DATE_FORMAT};

/// Column headings in write order.
pub const HEADER: [&str; 8] = [
    "Date",
    "Weight",
    "Waist",
    "Calories",
    "Protein",
    "Mood",
    "Phase",
    "Training Notes",
];

/// Text layouts accepted in the first column. Day/month orders are left
/// out since they read differently per locale.
const SHEET_DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];

/// Day zero of spreadsheet serial dates.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serial numbers past 9999-12-31 are not dates.
const MAX_SERIAL: f64 = 2_958_465.0;

/// One spreadsheet row, in the fixed column order of [`HEADER`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRow {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub waist: Option<f64>,
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub mood: Option<String>,
    pub phase: Option<String>,
    pub training_notes: Option<String>,
}

impl From<&Entry> for RemoteRow {
    fn from(entry: &Entry) -> Self {
        Self {
            date: entry.date,
            weight: entry.weight,
            waist: entry.waist,
            calories: entry.calories,
            protein: entry.protein,
            mood: entry.mood.clone(),
            phase: entry.phase.clone(),
            training_notes: entry.training_notes.clone(),
        }
    }
}

impl RemoteRow {
    /// Cell values for the Sheets API. Missing values are empty strings.
    pub fn to_values(&self) -> Vec<Value> {
        fn text(v: &Option<String>) -> Value {
            Value::String(v.clone().unwrap_or_default())
        }
        fn number<T: Into<serde_json::Number> + Copy>(v: Option<T>) -> Value {
            v.map(|n| Value::Number(n.into()))
                .unwrap_or_else(|| Value::String(String::new()))
        }
        fn decimal(v: Option<f64>) -> Value {
            v.and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(String::new()))
        }

        vec![
            Value::String(self.date.format(DATE_FORMAT).to_string()),
            decimal(self.weight),
            decimal(self.waist),
            number(self.calories),
            number(self.protein),
            text(&self.mood),
            text(&self.phase),
            text(&self.training_notes),
        ]
    }
}

/// Parses a first-column cell as a date, if it is one.
///
/// Accepts ISO text and spreadsheet serial numbers (days since 1899-12-30,
/// with any time of day in the fraction).
pub fn parse_sheet_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    SHEET_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(cell, format).ok())
        .or_else(|| serial_date(cell))
}

fn serial_date(cell: &str) -> Option<NaiveDate> {
    let serial: f64 = cell.parse().ok()?;
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Dates already present remotely. Header rows, blank rows and cells that
/// are not dates are skipped.
pub fn existing_dates(rows: &[Vec<String>]) -> HashSet<NaiveDate> {
    rows.iter()
        .filter_map(|row| row.first())
        .filter_map(|cell| parse_sheet_date(cell))
        .collect()
}

/// Local entries whose date does not appear in any remote row.
///
/// Only the date is compared: a remote row with the same date but different
/// values still counts as synced.
pub fn entries_to_sync<'a>(entries: &'a [Entry], rows: &[Vec<String>]) -> Vec<&'a Entry> {
    let remote = existing_dates(rows);
    entries
        .iter()
        .filter(|entry| !remote.contains(&entry.date))
        .collect()
}
