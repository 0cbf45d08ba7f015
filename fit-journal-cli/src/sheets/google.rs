use async_trait::async_trait;
use chrono::Utc;
use fit_journal_core::sync::AppendSummary;
use fit_journal_core::{RemoteError, RemoteRow, SheetsApi, SheetsConfig, SheetsRemote};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::oauth::{OAuthClient, OAuthError, StoredToken};

/// [`SheetsRemote`] backed by the Sheets REST API and a cached OAuth token.
pub struct GoogleSheetsRemote {
    api: SheetsApi,
    oauth: OAuthClient,
    token_path: PathBuf,
    token: Mutex<Option<StoredToken>>,
    ready: AtomicBool,
}

impl GoogleSheetsRemote {
    pub fn new(config: &SheetsConfig, token_path: PathBuf) -> Self {
        Self {
            api: SheetsApi::new(config.api_key.clone().unwrap_or_default()),
            oauth: OAuthClient::new(
                config.client_id.clone().unwrap_or_default(),
                config.client_secret.clone(),
            ),
            token_path,
            token: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    /// Returns a usable access token, refreshing it if it is about to expire.
    async fn access_token(&self) -> Result<String, RemoteError> {
        let mut guard = self.token.lock().await;
        let token = guard.as_ref().ok_or(RemoteError::NotAuthenticated)?;

        if token.is_fresh(Utc::now().timestamp()) {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            *guard = None;
            return Err(RemoteError::NotAuthenticated);
        };
        match self.oauth.refresh(&refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!("Refreshed Google access token");
                if let Err(e) = refreshed.save(&self.token_path) {
                    tracing::warn!("Failed to cache refreshed token: {}", e);
                }
                let access = refreshed.access_token.clone();
                *guard = Some(refreshed);
                Ok(access)
            }
            Err(OAuthError::Http(e)) => Err(RemoteError::Network(e)),
            Err(e) => {
                tracing::info!("Token refresh rejected: {}", e);
                *guard = None;
                Err(RemoteError::NotAuthenticated)
            }
        }
    }
}

fn auth_error(e: OAuthError) -> RemoteError {
    match e {
        OAuthError::Http(msg) => RemoteError::Network(msg),
        other => RemoteError::AuthorizationFailed(other.to_string()),
    }
}

#[async_trait]
impl SheetsRemote for GoogleSheetsRemote {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn initialize(&self) -> Result<(), RemoteError> {
        self.api.discover().await?;

        match StoredToken::load(&self.token_path) {
            Ok(token) => *self.token.lock().await = token,
            Err(e) => tracing::warn!("Ignoring unreadable token cache: {}", e),
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn is_signed_in(&self) -> bool {
        self.token.lock().await.is_some()
    }

    async fn sign_in(&self) -> Result<(), RemoteError> {
        let token = self.oauth.authorize().await.map_err(auth_error)?;
        if let Err(e) = token.save(&self.token_path) {
            tracing::warn!("Signed in, but the token was not cached: {}", e);
        }
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// Forgets the session locally first, then revokes it with Google.
    async fn sign_out(&self) -> Result<(), RemoteError> {
        let token = match self.token.lock().await.take() {
            Some(token) => Some(token),
            None => StoredToken::load(&self.token_path).ok().flatten(),
        };
        if self.token_path.exists() {
            std::fs::remove_file(&self.token_path)
                .map_err(|e| RemoteError::Network(e.to_string()))?;
        }

        match token {
            Some(token) => {
                let revocable = token.refresh_token.unwrap_or(token.access_token);
                self.oauth.revoke(&revocable).await.map_err(auth_error)
            }
            None => Ok(()),
        }
    }

    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        let token = self.access_token().await?;
        self.api.get_values(&token, spreadsheet_id, range).await
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[RemoteRow],
    ) -> Result<AppendSummary, RemoteError> {
        let token = self.access_token().await?;
        self.api
            .append_values(&token, spreadsheet_id, range, rows)
            .await
    }
}
