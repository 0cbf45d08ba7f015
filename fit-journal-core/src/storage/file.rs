use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{JournalBackend, StorageError};

/// File name of the journal blob inside the data directory.
pub const JOURNAL_FILE: &str = "journal.json";

/// Stores the journal as `<data_dir>/journal.json`.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the journal, so readers see either the old or the new blob.
#[derive(Clone, Debug)]
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the journal file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    fn temp_path(&self) -> PathBuf {
        self.data_dir.join(format!(".{}.tmp", JOURNAL_FILE))
    }
}

impl JournalBackend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path();
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let temp = self.temp_path();
        let written = File::create(&temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(StorageError::Io(temp, e));
        }

        let path = self.path();
        fs::rename(&temp, &path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            StorageError::Io(path, e)
        })
    }
}
