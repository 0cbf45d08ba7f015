use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::theme::Theme;

/// Journal-wide settings, persisted alongside the entries.
///
/// Missing keys in a stored blob take their default values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub auto_sync: bool,
    pub google_sheets_connected: bool,
    pub sheet_url: String,
    pub spreadsheet_id: String,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Addressable settings keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Theme,
    AutoSync,
    GoogleSheetsConnected,
    SheetUrl,
    SpreadsheetId,
    LastSync,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Theme,
        SettingKey::AutoSync,
        SettingKey::GoogleSheetsConnected,
        SettingKey::SheetUrl,
        SettingKey::SpreadsheetId,
        SettingKey::LastSync,
    ];

    /// Name as it appears in the persisted blob.
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::Theme => "theme",
            SettingKey::AutoSync => "autoSync",
            SettingKey::GoogleSheetsConnected => "googleSheetsConnected",
            SettingKey::SheetUrl => "sheetUrl",
            SettingKey::SpreadsheetId => "spreadsheetId",
            SettingKey::LastSync => "lastSync",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = SettingError;

    /// Accepts `autoSync`, `auto_sync` and `auto-sync` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        SettingKey::ALL
            .into_iter()
            .find(|key| key.name().to_lowercase() == normalized)
            .ok_or_else(|| SettingError::UnknownKey(s.to_string()))
    }
}

/// A typed settings value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
    Theme(Theme),
    Timestamp(DateTime<Utc>),
}

impl SettingValue {
    /// Coerces raw text (e.g. from the command line) into the type `key` expects.
    pub fn parse_for(key: SettingKey, raw: &str) -> Result<Self, SettingError> {
        let invalid = || SettingError::InvalidValue {
            key,
            value: raw.to_string(),
        };

        match key {
            SettingKey::Theme => raw.parse().map(SettingValue::Theme).map_err(|_| invalid()),
            SettingKey::AutoSync | SettingKey::GoogleSheetsConnected => {
                match raw.trim().to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(SettingValue::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(SettingValue::Bool(false)),
                    _ => Err(invalid()),
                }
            }
            SettingKey::SheetUrl | SettingKey::SpreadsheetId => {
                Ok(SettingValue::Text(raw.trim().to_string()))
            }
            SettingKey::LastSync => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| SettingValue::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(v) => write!(f, "{}", v),
            SettingValue::Text(v) => write!(f, "{}", v),
            SettingValue::Theme(v) => write!(f, "{}", v),
            SettingValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingError {
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for setting {key}")]
    InvalidValue { key: SettingKey, value: String },

    #[error("Setting {key} does not accept a {got} value")]
    TypeMismatch { key: SettingKey, got: &'static str },
}

impl Settings {
    /// Returns the value for `key`, or `None` when it is unset
    /// (an empty string or a missing timestamp).
    pub fn get(&self, key: SettingKey) -> Option<SettingValue> {
        match key {
            SettingKey::Theme => Some(SettingValue::Theme(self.theme)),
            SettingKey::AutoSync => Some(SettingValue::Bool(self.auto_sync)),
            SettingKey::GoogleSheetsConnected => {
                Some(SettingValue::Bool(self.google_sheets_connected))
            }
            SettingKey::SheetUrl => non_empty(&self.sheet_url),
            SettingKey::SpreadsheetId => non_empty(&self.spreadsheet_id),
            SettingKey::LastSync => self.last_sync.map(SettingValue::Timestamp),
        }
    }

    /// Returns the value for `key`, falling back to `default` when unset.
    pub fn get_or(&self, key: SettingKey, default: SettingValue) -> SettingValue {
        self.get(key).unwrap_or(default)
    }

    /// Sets `key` to `value`. The value's type must match the key.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), SettingError> {
        match (key, value) {
            (SettingKey::Theme, SettingValue::Theme(theme)) => self.theme = theme,
            (SettingKey::AutoSync, SettingValue::Bool(v)) => self.auto_sync = v,
            (SettingKey::GoogleSheetsConnected, SettingValue::Bool(v)) => {
                self.google_sheets_connected = v
            }
            (SettingKey::SheetUrl, SettingValue::Text(v)) => self.sheet_url = v,
            (SettingKey::SpreadsheetId, SettingValue::Text(v)) => self.spreadsheet_id = v,
            (SettingKey::LastSync, SettingValue::Timestamp(v)) => self.last_sync = Some(v),
            (key, value) => {
                return Err(SettingError::TypeMismatch {
                    key,
                    got: value.kind(),
                })
            }
        }
        Ok(())
    }
}

impl SettingValue {
    fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "boolean",
            SettingValue::Text(_) => "text",
            SettingValue::Theme(_) => "theme",
            SettingValue::Timestamp(_) => "timestamp",
        }
    }
}

fn non_empty(value: &str) -> Option<SettingValue> {
    if value.is_empty() {
        None
    } else {
        Some(SettingValue::Text(value.to_string()))
    }
}
