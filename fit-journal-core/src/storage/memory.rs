use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{JournalBackend, StorageError};

#[derive(Debug, Default)]
struct MemoryInner {
    blob: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: Mutex<usize>,
}

/// In-memory backend. Clones share the same blob.
///
/// Writes can be made to fail with [`StorageError::QuotaExceeded`] to
/// exercise degraded operation.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `bytes`.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        let backend = Self::default();
        *backend.inner.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes.into());
        backend
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current stored blob.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.inner
            .blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        *self.inner.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JournalBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded);
        }
        *self.inner.blob.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes.to_vec());
        *self.inner.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
