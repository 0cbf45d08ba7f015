//! In-process [`SheetsRemote`] for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::config::SheetsConfig;
use super::error::RemoteError;
use super::remote::{AppendSummary, SheetsRemote};
use super::rows::RemoteRow;

#[derive(Debug, Default)]
pub struct MockState {
    pub ready: bool,
    pub signed_in: bool,
    pub rows: Vec<Vec<String>>,
    pub appends: Vec<Vec<RemoteRow>>,
    pub reads: usize,
    pub sign_ins: usize,
    pub initializations: usize,
    pub fail_sign_in: bool,
    pub fail_sign_out: bool,
    pub fail_reads: bool,
    pub fail_appends: bool,
    /// The next call reports an expired session.
    pub expire_session: bool,
}

/// In-process spreadsheet. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    pub state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn ready() -> Self {
        let remote = Self::default();
        remote.with(|s| s.ready = true);
        remote
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    fn take_expiry(&self) -> bool {
        self.with(|s| std::mem::take(&mut s.expire_session))
    }
}

#[async_trait]
impl SheetsRemote for MockRemote {
    fn is_ready(&self) -> bool {
        self.with(|s| s.ready)
    }

    async fn initialize(&self) -> Result<(), RemoteError> {
        self.with(|s| {
            s.ready = true;
            s.initializations += 1;
        });
        Ok(())
    }

    async fn is_signed_in(&self) -> bool {
        self.with(|s| s.signed_in)
    }

    async fn sign_in(&self) -> Result<(), RemoteError> {
        self.with(|s| {
            s.sign_ins += 1;
            if s.fail_sign_in {
                return Err(RemoteError::AuthorizationFailed("access_denied".to_string()));
            }
            s.signed_in = true;
            Ok(())
        })
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.with(|s| {
            s.signed_in = false;
            if s.fail_sign_out {
                Err(RemoteError::Network("connection reset".to_string()))
            } else {
                Ok(())
            }
        })
    }

    async fn read_rows(
        &self,
        _spreadsheet_id: &str,
        _range: &str,
    ) -> Result<Vec<Vec<String>>, RemoteError> {
        tokio::task::yield_now().await;
        if self.take_expiry() {
            return Err(RemoteError::NotAuthenticated);
        }
        self.with(|s| {
            s.reads += 1;
            if s.fail_reads {
                Err(RemoteError::Network("timed out".to_string()))
            } else {
                Ok(s.rows.clone())
            }
        })
    }

    async fn append_rows(
        &self,
        _spreadsheet_id: &str,
        _range: &str,
        rows: &[RemoteRow],
    ) -> Result<AppendSummary, RemoteError> {
        tokio::task::yield_now().await;
        if self.take_expiry() {
            return Err(RemoteError::NotAuthenticated);
        }
        self.with(|s| {
            if s.fail_appends {
                return Err(RemoteError::Api {
                    status: 429,
                    message: "Quota exceeded".to_string(),
                });
            }
            s.appends.push(rows.to_vec());
            s.rows.extend(rows.iter().map(|r| {
                r.to_values()
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect()
            }));
            Ok(AppendSummary {
                updated_rows: rows.len(),
            })
        })
    }
}

pub fn test_config() -> SheetsConfig {
    SheetsConfig {
        api_key: Some("api-key".to_string()),
        client_id: Some("client-id".to_string()),
        client_secret: None,
        spreadsheet_id: Some("sheet-123".to_string()),
        range: None,
    }
}
