//! Backing stores for the message database.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::message_database::{Message, Messages};

/// Whole-sequence persistence. Callers serialize access; implementations
/// only have to make each `save` all-or-nothing.
pub trait Storage: Send + Sync {
    /// Create the backing resource holding an empty sequence if it does not exist yet.
    fn init(&self) -> Result<(), StorageError>;

    /// Read the full stored sequence.
    fn load(&self) -> Result<Messages, StorageError>;

    /// Replace the stored sequence with `messages`.
    fn save(&self, messages: &[Message]) -> Result<(), StorageError>;
}

/// A JSON array of messages in a single file, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStorage { path: path.into() }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Storage for JsonFileStorage {
    fn init(&self) -> Result<(), StorageError> {
        if self.path.is_file() {
            return Ok(());
        }
        fs::create_dir_all(self.dir())?;
        tracing::info!(path = %self.path.display(), "creating empty data file");
        self.save(&[])
    }

    fn load(&self) -> Result<Messages, StorageError> {
        match fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, messages: &[Message]) -> Result<(), StorageError> {
        // Write next to the target so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        serde_json::to_writer_pretty(&mut tmp, messages)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        tracing::debug!(path = %self.path.display(), count = messages.len(), "saved messages");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn message(id: i64, text: &str) -> Message {
        Message {
            id,
            username: "alice".to_string(),
            text: text.to_string(),
            timestamp: "2024-05-01T10:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.json");
        let storage = JsonFileStorage::new(&path);
        assert!(storage.load().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn init_creates_empty_array_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/messages.json");
        let storage = JsonFileStorage::new(&path);

        storage.init().unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.trim(), "[]");

        storage.save(&[message(1, "keep me")]).unwrap();
        storage.init().unwrap();
        assert_eq!(storage.load().unwrap(), vec![message(1, "keep me")]);
    }

    #[test]
    fn save_replaces_whole_sequence() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("messages.json"));

        storage.save(&[message(1, "a"), message(2, "b")]).unwrap();
        storage.save(&[message(3, "c")]).unwrap();

        assert_eq!(storage.load().unwrap(), vec![message(3, "c")]);
    }

    #[test]
    fn save_leaves_no_temporary_files_behind() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("messages.json"));
        storage.save(&[message(1, "a")]).unwrap();
        storage.save(&[message(2, "b")]).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unparsable_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.json");
        fs::write(&path, "[{\"id\": 1,").unwrap();

        let storage = JsonFileStorage::new(path);
        assert!(matches!(storage.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn non_ascii_text_survives() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.json");
        let storage = JsonFileStorage::new(&path);
        storage.save(&[message(1, "héllo wörld ✓")]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("héllo wörld ✓"));
        assert_eq!(storage.load().unwrap()[0].text, "héllo wörld ✓");
    }
}
