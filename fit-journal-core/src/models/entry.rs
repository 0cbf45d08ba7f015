use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Date format used for entry keys and form input.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day's body-composition and nutrition record.
///
/// The `date` is the entry's identity within a journal: saving another entry
/// with the same date replaces this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub waist: Option<f64>,
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub mood: Option<String>,
    pub phase: Option<String>,
    pub training_notes: Option<String>,
    /// Time of the last write, kept for audit only.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weight: None,
            waist: None,
            calories: None,
            protein: None,
            mood: None,
            phase: None,
            training_notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_waist(mut self, waist: f64) -> Self {
        self.waist = Some(waist);
        self
    }

    pub fn with_calories(mut self, calories: i64) -> Self {
        self.calories = Some(calories);
        self
    }

    pub fn with_protein(mut self, protein: i64) -> Self {
        self.protein = Some(protein);
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_training_notes(mut self, notes: impl Into<String>) -> Self {
        self.training_notes = Some(notes.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns true if the entry carries at least one numeric measurement.
    pub fn has_measurements(&self) -> bool {
        self.weight.is_some()
            || self.waist.is_some()
            || self.calories.is_some()
            || self.protein.is_some()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)?;
        if let Some(phase) = &self.phase {
            write!(f, " [{}]", phase)?;
        }
        if let Some(weight) = self.weight {
            write!(f, " weight {} kg", weight)?;
        }
        if let Some(waist) = self.waist {
            write!(f, " waist {}\"", waist)?;
        }
        if let Some(calories) = self.calories {
            write!(f, " calories {}", calories)?;
        }
        if let Some(protein) = self.protein {
            write!(f, " protein {}g", protein)?;
        }
        if let Some(mood) = &self.mood {
            write!(f, " mood {}", mood)?;
        }
        if let Some(notes) = &self.training_notes {
            write!(f, " notes: {}", notes)?;
        }
        Ok(())
    }
}

/// Errors raised while turning raw form input into an [`Entry`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntryError {
    #[error("A date is required")]
    MissingDate,

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Raw form fields as the UI collects them.
///
/// Every field is optional text; [`EntryForm::into_entry`] applies the
/// coercion rules.
#[derive(Debug, Clone, Default)]
pub struct EntryForm {
    pub date: Option<String>,
    pub weight: Option<String>,
    pub waist: Option<String>,
    pub calories: Option<String>,
    pub protein: Option<String>,
    pub mood: Option<String>,
    pub phase: Option<String>,
    pub training_notes: Option<String>,
}

impl EntryForm {
    /// Validates the date and coerces numeric fields.
    ///
    /// Blank fields become `None`. Integer fields accept a decimal and
    /// truncate it toward zero.
    pub fn into_entry(self, now: DateTime<Utc>) -> Result<Entry, EntryError> {
        let raw_date = non_blank(self.date).ok_or(EntryError::MissingDate)?;
        let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
            .map_err(|_| EntryError::InvalidDate(raw_date.clone()))?;

        Ok(Entry {
            date,
            weight: parse_decimal("weight", self.weight)?,
            waist: parse_decimal("waist", self.waist)?,
            calories: parse_integer("calories", self.calories)?,
            protein: parse_integer("protein", self.protein)?,
            mood: non_blank(self.mood),
            phase: non_blank(self.phase),
            training_notes: non_blank(self.training_notes),
            created_at: now,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_decimal(field: &'static str, value: Option<String>) -> Result<Option<f64>, EntryError> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(EntryError::InvalidNumber { field, value: raw }),
    }
}

fn parse_integer(field: &'static str, value: Option<String>) -> Result<Option<i64>, EntryError> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(Some(v));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() < i64::MAX as f64 => Ok(Some(v.trunc() as i64)),
        _ => Err(EntryError::InvalidNumber { field, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entry_builder() {
        let entry = Entry::new(date(2024, 3, 1))
            .with_weight(80.5)
            .with_calories(2400)
            .with_phase("Cutting");

        assert_eq!(entry.weight, Some(80.5));
        assert_eq!(entry.calories, Some(2400));
        assert_eq!(entry.phase.as_deref(), Some("Cutting"));
        assert!(entry.waist.is_none());
        assert!(entry.has_measurements());
    }

    #[test]
    fn test_entry_json_uses_camel_case() {
        let entry = Entry::new(date(2024, 3, 1)).with_training_notes("Legs");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["trainingNotes"], "Legs");
        assert!(json.get("createdAt").is_some());
        assert!(json["weight"].is_null());
    }

    #[test]
    fn test_entry_reads_legacy_blob_without_created_at() {
        let json = r#"{"date":"2024-01-05","weight":81.2,"waist":null,"calories":2100}"#;
        let entry: Entry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.date, date(2024, 1, 5));
        assert_eq!(entry.weight, Some(81.2));
        assert_eq!(entry.calories, Some(2100));
        assert!(entry.protein.is_none());
    }

    #[test]
    fn test_form_requires_date() {
        let form = EntryForm {
            weight: Some("80".to_string()),
            ..Default::default()
        };
        assert_eq!(form.into_entry(Utc::now()), Err(EntryError::MissingDate));

        let blank = EntryForm {
            date: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.into_entry(Utc::now()), Err(EntryError::MissingDate));
    }

    #[test]
    fn test_form_rejects_impossible_date() {
        let form = EntryForm {
            date: Some("2024-02-30".to_string()),
            ..Default::default()
        };
        assert_eq!(
            form.into_entry(Utc::now()),
            Err(EntryError::InvalidDate("2024-02-30".to_string()))
        );
    }

    #[test]
    fn test_form_coerces_numbers() {
        let form = EntryForm {
            date: Some("2024-03-01".to_string()),
            weight: Some(" 80.5 ".to_string()),
            waist: Some(String::new()),
            calories: Some("2350.9".to_string()),
            protein: Some("180".to_string()),
            mood: Some("  ".to_string()),
            phase: Some("Cutting".to_string()),
            training_notes: None,
        };
        let entry = form.into_entry(Utc::now()).unwrap();

        assert_eq!(entry.date, date(2024, 3, 1));
        assert_eq!(entry.weight, Some(80.5));
        assert_eq!(entry.waist, None);
        assert_eq!(entry.calories, Some(2350));
        assert_eq!(entry.protein, Some(180));
        assert_eq!(entry.mood, None);
        assert_eq!(entry.phase.as_deref(), Some("Cutting"));
    }

    #[test]
    fn test_form_rejects_garbage_numbers() {
        let form = EntryForm {
            date: Some("2024-03-01".to_string()),
            protein: Some("lots".to_string()),
            ..Default::default()
        };
        assert_eq!(
            form.into_entry(Utc::now()),
            Err(EntryError::InvalidNumber {
                field: "protein",
                value: "lots".to_string()
            })
        );
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry::new(date(2024, 3, 1))
            .with_weight(79.9)
            .with_phase("Bulking")
            .with_mood("Great");
        let output = format!("{}", entry);

        assert!(output.contains("2024-03-01"));
        assert!(output.contains("[Bulking]"));
        assert!(output.contains("79.9 kg"));
        assert!(output.contains("mood Great"));
    }
}
