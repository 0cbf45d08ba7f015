use serde::{Deserialize, Serialize};

use super::error::SyncError;

/// Column range rows are read from and appended to.
pub const DEFAULT_RANGE: &str = "Sheet1!A:H";

/// Prefix of the placeholder values shipped in sample configuration.
const PLACEHOLDER_PREFIX: &str = "YOUR_";

/// Remote spreadsheet configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Google API key
    pub api_key: Option<String>,
    /// OAuth client identifier
    pub client_id: Option<String>,
    /// OAuth client secret (installed-app clients)
    pub client_secret: Option<String>,
    /// Destination spreadsheet
    pub spreadsheet_id: Option<String>,
    /// Range in A1 notation, defaults to `Sheet1!A:H`
    pub range: Option<String>,
}

impl SheetsConfig {
    /// Returns true if the api key, client id and spreadsheet id are all set.
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// Fails with [`SyncError::Configuration`] naming every unset or
    /// placeholder identity value.
    pub fn validate(&self) -> Result<(), SyncError> {
        let missing: Vec<&str> = [
            ("api_key", &self.api_key),
            ("client_id", &self.client_id),
            ("spreadsheet_id", &self.spreadsheet_id),
        ]
        .into_iter()
        .filter(|(_, value)| !is_set(value))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Configuration(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    pub fn range(&self) -> &str {
        self.range
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_RANGE)
    }

    pub fn spreadsheet_id(&self) -> &str {
        self.spreadsheet_id.as_deref().unwrap_or_default()
    }
}

fn is_set(value: &Option<String>) -> bool {
    match value.as_deref().map(str::trim) {
        Some(v) => !v.is_empty() && !v.starts_with(PLACEHOLDER_PREFIX),
        None => false,
    }
}

/// Browser URL of a spreadsheet.
pub fn sheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}", spreadsheet_id)
}
