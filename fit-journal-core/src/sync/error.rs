//! Sync error types.

use thiserror::Error;

use crate::store::StoreError;

/// Failures reported by a [`SheetsRemote`](super::SheetsRemote) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Sheets client is not ready")]
    NotReady,

    #[error("No active Google session")]
    NotAuthenticated,

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sheets API returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// Classified errors produced by synchronizer operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Credentials or destination missing. Never retried automatically.
    #[error("Google Sheets is not configured: {0}")]
    Configuration(String),

    #[error("Not connected to Google Sheets")]
    NotConnected,

    /// A read, write or auth call failed. Local state is untouched and the
    /// journal stays pending, so the next sync re-diffs from scratch.
    #[error("Sheets request failed: {0}")]
    TransientNetwork(String),

    #[error("Google Sheets authentication failed: {0}")]
    NotAuthenticated(String),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotAuthenticated => {
                SyncError::NotAuthenticated("no active session".to_string())
            }
            RemoteError::AuthorizationFailed(reason) => SyncError::NotAuthenticated(reason),
            RemoteError::NotReady
            | RemoteError::Network(_)
            | RemoteError::Api { .. } => SyncError::TransientNetwork(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_classification() {
        assert!(matches!(
            SyncError::from(RemoteError::NotAuthenticated),
            SyncError::NotAuthenticated(_)
        ));
        assert!(matches!(
            SyncError::from(RemoteError::AuthorizationFailed("denied".into())),
            SyncError::NotAuthenticated(reason) if reason == "denied"
        ));
        assert!(matches!(
            SyncError::from(RemoteError::Network("timeout".into())),
            SyncError::TransientNetwork(_)
        ));

        let api = SyncError::from(RemoteError::Api {
            status: 500,
            message: "backend error".into(),
        });
        assert_eq!(
            api.to_string(),
            "Sheets request failed: Sheets API returned 500: backend error"
        );
    }
}
