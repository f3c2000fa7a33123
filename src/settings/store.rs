use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Notification that `key` was rewritten. Receivers reload the whole key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsChange {
    pub key: String,
}

/// Shared key-value settings with change notification.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> BrandframeResult<Option<Value>>;
    /// Replace `key`. Either the whole value is stored or nothing changes.
    fn put(&self, key: &str, value: Value) -> BrandframeResult<()>;
    /// A new receiver for every later successful `put`.
    fn subscribe(&self) -> Receiver<SettingsChange>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> BrandframeResult<Option<Value>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Value) -> BrandframeResult<()> {
        (**self).put(key, value)
    }

    fn subscribe(&self) -> Receiver<SettingsChange> {
        (**self).subscribe()
    }
}

#[derive(Default)]
struct Subscribers {
    senders: Mutex<Vec<Sender<SettingsChange>>>,
}

impl Subscribers {
    fn subscribe(&self) -> Receiver<SettingsChange> {
        let (tx, rx) = channel();
        lock(&self.senders).push(tx);
        rx
    }

    fn broadcast(&self, key: &str) {
        let mut senders = lock(&self.senders);
        senders.retain(|tx| {
            tx.send(SettingsChange {
                key: key.to_owned(),
            })
            .is_ok()
        });
        tracing::debug!(key, subscribers = senders.len(), "settings change broadcast");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store, used by tests and as a scratch backend.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, Value>>,
    subscribers: Subscribers,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            subscribers: Subscribers::default(),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> BrandframeResult<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> BrandframeResult<()> {
        lock(&self.values).insert(key.to_owned(), value);
        self.subscribers.broadcast(key);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<SettingsChange> {
        self.subscribers.subscribe()
    }
}

/// Settings persisted as one JSON object (`{"departments": [...], "fonts": [...]}`).
///
/// Writes go to a sibling temp file that is renamed over the original, so readers never see a
/// half-written file and a failed write leaves the previous contents in place.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
    subscribers: Subscribers,
}

impl JsonFileSettingsStore {
    /// Open `path`; a missing file starts empty.
    #[tracing::instrument(level = "debug")]
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug) -> BrandframeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = read_map(&path)?;
        tracing::debug!(path = %path.display(), keys = values.len(), "settings opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
            subscribers: Subscribers::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative paths in the settings resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Re-read the file, picking up writes made by other processes.
    pub fn reload(&self) -> BrandframeResult<()> {
        let fresh = read_map(&self.path)?;
        *lock(&self.values) = fresh;
        Ok(())
    }
}

fn read_map(path: &Path) -> BrandframeResult<BTreeMap<String, Value>> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            BrandframeError::serde(format!("settings file '{}': {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(BrandframeError::evaluation(format!(
            "failed to read settings '{}': {e}",
            path.display()
        ))),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> BrandframeResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings.json".to_owned());
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));
    let result = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(BrandframeError::evaluation(format!(
            "failed to write settings '{}': {e}",
            path.display()
        )));
    }
    Ok(())
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> BrandframeResult<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> BrandframeResult<()> {
        {
            let mut values = lock(&self.values);
            let mut next = values.clone();
            next.insert(key.to_owned(), value);
            let bytes = serde_json::to_vec_pretty(&next)?;
            write_atomic(&self.path, &bytes)?;
            *values = next;
        }
        tracing::info!(key, path = %self.path.display(), "settings written");
        self.subscribers.broadcast(key);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<SettingsChange> {
        self.subscribers.subscribe()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/store.rs"]
mod tests;
