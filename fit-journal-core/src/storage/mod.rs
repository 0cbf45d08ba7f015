//! Blob persistence for the journal.
//!
//! The whole journal is stored as one serialized blob. Backends only move
//! bytes; a write either replaces the previous blob completely or fails and
//! leaves it untouched.

mod file;
mod memory;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use file::{FileBackend, JOURNAL_FILE};
pub use memory::MemoryBackend;

/// A place the serialized journal can be read from and written to.
pub trait JournalBackend: Send + Sync {
    /// Returns `Ok(None)` when nothing has been persisted yet.
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the stored blob with `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Errors that can occur while persisting the journal.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Failed to serialize journal: {0}")]
    Serialize(String),
}
