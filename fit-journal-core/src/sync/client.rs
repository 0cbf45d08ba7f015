//! HTTP client for the Google Sheets v4 REST API.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::RemoteError;
use super::remote::AppendSummary;
use super::rows::RemoteRow;

/// Default API endpoint.
pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_rows: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin wrapper over the Sheets REST endpoints. Calls take the OAuth access
/// token explicitly; session handling belongs to the caller.
#[derive(Debug, Clone)]
pub struct SheetsApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SheetsApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(SHEETS_API_URL, api_key)
    }

    /// Creates a client against another endpoint (a proxy or test server).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the API discovery document. Succeeds only if the endpoint is
    /// reachable and accepts the api key.
    pub async fn discover(&self) -> Result<(), RemoteError> {
        let url = self.discovery_url();
        tracing::debug!("Loading Sheets discovery document");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check_status(response).await.map(|_| ())
    }

    /// `values.get`: reads `range` unformatted, with dates as serial
    /// numbers so the result does not depend on the spreadsheet locale.
    pub async fn get_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        let url = self.values_url(spreadsheet_id, range, "");

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "SERIAL_NUMBER"),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let body: ValueRange = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    /// `values.append` with `USER_ENTERED` input, all rows in one request.
    pub async fn append_values(
        &self,
        access_token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: &[RemoteRow],
    ) -> Result<AppendSummary, RemoteError> {
        let url = self.values_url(spreadsheet_id, range, ":append");
        let values: Vec<Vec<Value>> = rows.iter().map(RemoteRow::to_values).collect();

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let body: AppendResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        Ok(AppendSummary {
            updated_rows: body.updates.map(|u| u.updated_rows).unwrap_or(rows.len()),
        })
    }

    fn discovery_url(&self) -> String {
        format!(
            "{}/$discovery/rest?version=v4&key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, method: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}?key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range),
            method,
            urlencoding::encode(&self.api_key)
        )
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::NotAuthenticated);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
