use async_trait::async_trait;

use super::error::RemoteError;
use super::rows::RemoteRow;

/// Result of an append call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendSummary {
    pub updated_rows: usize,
}

/// The remote spreadsheet service as the synchronizer sees it.
///
/// Implementations own their session state. `initialize` loads whatever the
/// client needs before it can make calls (discovery document, cached
/// token); until it succeeds `is_ready` returns false.
#[async_trait]
pub trait SheetsRemote: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn initialize(&self) -> Result<(), RemoteError>;

    async fn is_signed_in(&self) -> bool;

    /// Acquires an authenticated session, interactively if needed.
    async fn sign_in(&self) -> Result<(), RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;

    /// Returns every row in `range` as text cells.
    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, RemoteError>;

    /// Appends `rows` after the last row of `range` in one call.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[RemoteRow],
    ) -> Result<AppendSummary, RemoteError>;
}
