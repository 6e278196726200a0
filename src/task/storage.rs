#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use crate::error::TodoError;
use crate::task::model::Task;

pub const DEFAULT_TASKS_KEY: &str = "todos";

/// A durable slot store addressed by fixed names.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per slot inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create data dir {}", self.dir.display()))
    }

    fn slot_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.slot_path(key)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TodoError::IoPath { path, source }.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.ensure_dir()?;
        let path = self.slot_path(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| {
                format!("failed to rename {} -> {}", tmp.display(), path.display())
            });
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.slot_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TodoError::IoPath { path, source }.into()),
        }
    }
}

/// In-process store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set`/`remove` fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn slots(&self) -> anyhow::Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.slots()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.slots()?.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.slots()?.remove(key);
        Ok(())
    }
}

/// Persists the whole task collection under a single key.
#[derive(Debug, Clone)]
pub struct TaskStorage<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> TaskStorage<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_TASKS_KEY)
    }

    #[must_use]
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Never fails: an absent, unreadable or malformed slot loads as empty.
    #[must_use]
    pub fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(Some(tasks)) => tasks,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %format!("{e:#}"), "discarding unreadable task data");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> anyhow::Result<Option<Vec<Task>>> {
        let Some(data) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let tasks: Vec<Task> = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse slot '{}'", self.key))?;
        let mut seen = HashSet::with_capacity(tasks.len());
        if let Some(dup) = tasks.iter().find(|t| !seen.insert(t.id.as_str())) {
            anyhow::bail!("duplicate task id '{}' in slot '{}'", dup.id, self.key);
        }
        Ok(Some(tasks))
    }

    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let data = serde_json::to_vec(tasks)?;
        self.store
            .set(&self.key, &data)
            .with_context(|| format!("failed to save slot '{}'", self.key))
    }
}

pub fn validate_key(key: &str) -> Result<(), TodoError> {
    let invalid = |msg: &str| TodoError::InvalidStorageKey {
        key: key.to_owned(),
        msg: msg.to_owned(),
    };
    if key.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    if key.contains("..") {
        return Err(invalid("must not contain '..'"));
    }
    Ok(())
}
