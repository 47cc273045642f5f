//! Persisted conversation history under one fixed key.

use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{from_reader, to_writer_pretty};

use crate::{Error, Message, Result};

/// The fixed key the history is stored under.
pub const HISTORY_KEY: &str = "gemchat_history.json";

/// Where the conversation is kept between runs.
pub trait HistoryStorage: Send {
    /// Reads the saved history, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Vec<Message>>>;

    /// Overwrites the saved history.
    fn save(&self, messages: &[Message]) -> Result<()>;
}

/// Stores the history as a JSON array in `dir/gemchat_history.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a storage rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the history file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(HISTORY_KEY)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{HISTORY_KEY}.tmp"))
    }
}

impl HistoryStorage for FileStorage {
    fn load(&self) -> Result<Option<Vec<Message>>> {
        let path = self.path();
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io("failed to open history file", err)),
        };
        let messages: Vec<Message> = from_reader(BufReader::new(file)).map_err(|err| {
            Error::serialization("failed to parse history file", Some(Box::new(err)))
        })?;
        Ok(Some(messages))
    }

    fn save(&self, messages: &[Message]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| Error::io("failed to create history directory", err))?;
        let temp = self.temp_path();
        write_json(&temp, messages)?;
        fs::rename(&temp, self.path())
            .map_err(|err| Error::io("failed to replace history file", err))
    }
}

fn write_json(path: &Path, messages: &[Message]) -> Result<()> {
    let file =
        fs::File::create(path).map_err(|err| Error::io("failed to create history file", err))?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, messages)
        .map_err(|err| Error::serialization("failed to serialize history", Some(Box::new(err))))?;
    writer
        .flush()
        .map_err(|err| Error::io("failed to write history file", err))
}

/// Keeps the history in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: Mutex<Option<Vec<Message>>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that already holds `messages`.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            saved: Mutex::new(Some(messages)),
        }
    }

    /// The last saved history.
    pub fn snapshot(&self) -> Option<Vec<Message>> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }
}

impl HistoryStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<Message>>> {
        Ok(self.snapshot())
    }

    fn save(&self, messages: &[Message]) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| Error::validation("history storage poisoned", None))?;
        *saved = Some(messages.to_vec());
        Ok(())
    }
}

impl<S: HistoryStorage + Sync> HistoryStorage for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Vec<Message>>> {
        (**self).load()
    }

    fn save(&self, messages: &[Message]) -> Result<()> {
        (**self).save(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageId, Role};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gemchat-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_loads_none() {
        let storage = FileStorage::new(scratch_dir("missing"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = scratch_dir("roundtrip");
        let storage = FileStorage::new(&dir);
        let mut error = Message::new(MessageId::new(1), Role::Model, "Rate limited.");
        error.is_error = true;
        let messages = vec![Message::new(MessageId::new(0), Role::User, "Hi"), error];

        storage.save(&messages).unwrap();
        assert!(storage.path().ends_with(HISTORY_KEY));
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, messages);

        storage.save(&messages[..1]).unwrap();
        assert_eq!(storage.load().unwrap().unwrap().len(), 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(HISTORY_KEY), "{not a list").unwrap();
        let storage = FileStorage::new(&dir);
        assert!(matches!(
            storage.load(),
            Err(Error::Serialization { .. })
        ));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());
        let messages = vec![Message::new(MessageId::new(0), Role::User, "Hi")];
        storage.save(&messages).unwrap();
        assert_eq!(storage.snapshot().unwrap(), messages);
    }
}
