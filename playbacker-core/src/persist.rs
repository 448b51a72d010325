use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use once_cell::unsync::OnceCell;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

/// String-only key-value storage that outlives the process.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, or remove the key for `None`.  Failures are
    /// logged and swallowed.
    fn set(&self, key: &str, value: Option<&str>);
}

pub type StorageHandle = Arc<dyn Storage>;

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> StorageHandle {
        Arc::new(Self::default())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let mut entries = self.entries.lock();
        match value {
            Some(value) => entries.insert(key.to_owned(), value.to_owned()),
            None => entries.remove(key),
        };
    }
}

/// Storage backed by a single JSON object file, rewritten on every `set`.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: PathBuf) -> StorageHandle {
        let entries = match File::open(&path) {
            Ok(file) => {
                log::info!("loading selection: {:?}", &path);
                serde_json::from_reader(file).unwrap_or_else(|err| {
                    log::warn!("discarding unreadable storage {:?}: {}", &path, err);
                    BTreeMap::new()
                })
            }
            Err(_) => BTreeMap::new(),
        };
        Arc::new(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(dir) = self.path.parent() {
            mkdir_if_not_exists(dir)?;
        }
        // Replace the whole file in one step.
        let staging = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&staging)?);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush()?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let mut entries = self.entries.lock();
        match value {
            Some(value) => entries.insert(key.to_owned(), value.to_owned()),
            None => entries.remove(key),
        };
        if let Err(err) = self.save(&entries) {
            log::error!("failed to save storage {:?}: {}", &self.path, err);
        }
    }
}

pub fn mkdir_if_not_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Conversion between a value and its stored string form.
pub struct Codec<T> {
    pub serialize: fn(&T) -> Result<String, Error>,
    pub deserialize: fn(&str) -> Result<T, Error>,
}

impl<T: Serialize + DeserializeOwned> Codec<T> {
    pub fn json() -> Self {
        Self {
            serialize: |value| Ok(serde_json::to_string(value)?),
            deserialize: |raw| Ok(serde_json::from_str(raw)?),
        }
    }
}

/// Value that survives restarts.  Read lazily from storage on first access,
/// written through on every accepted `set`.  A value that fails to
/// (de)serialize is treated as absent.
pub struct Persisted<T> {
    key: &'static str,
    storage: StorageHandle,
    codec: Codec<T>,
    value: OnceCell<Option<T>>,
}

impl<T: PartialEq> Persisted<T> {
    pub fn new(key: &'static str, storage: StorageHandle, codec: Codec<T>) -> Self {
        Self {
            key,
            storage,
            codec,
            value: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get_or_init(|| self.load()).as_ref()
    }

    fn load(&self) -> Option<T> {
        let raw = self.storage.get(self.key)?;
        match (self.codec.deserialize)(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring stored {:?}: {}", self.key, err);
                None
            }
        }
    }

    /// Set a new value unless it equals the current one.  Returns `true` if
    /// the value was written.
    pub fn set(&mut self, value: Option<T>) -> bool {
        self.set_with(value, |prev, next| prev == next)
    }

    /// Like `set`, but `equals(prev, next)` decides whether the write is
    /// skipped.  A skipped write leaves both memory and storage untouched.
    pub fn set_with(
        &mut self,
        value: Option<T>,
        equals: impl FnOnce(Option<&T>, Option<&T>) -> bool,
    ) -> bool {
        if equals(self.get(), value.as_ref()) {
            return false;
        }
        let value = match value {
            Some(value) => match (self.codec.serialize)(&value) {
                Ok(raw) => {
                    self.storage.set(self.key, Some(&raw));
                    Some(value)
                }
                Err(err) => {
                    log::warn!("storing {:?} as absent: {}", self.key, err);
                    self.storage.set(self.key, None);
                    None
                }
            },
            None => {
                self.storage.set(self.key, None);
                None
            }
        };
        self.value = OnceCell::new();
        let _ = self.value.set(value);
        true
    }
}
