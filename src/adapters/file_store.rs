//! Flat-file storage adapter.
//!
//! Implements [`StoragePort`] over a single JSON document on disk:
//!
//! ```text
//! { "<namespace>": { "<key>": <value>, ... }, ... }
//! ```
//!
//! Values must themselves be JSON so the file stays human-readable; the
//! relay store only ever writes JSON.  Every write replaces the file via
//! temp-file + rename, so a power cut leaves either the old or the new
//! document, never a torn one.
//!
//! [`MemoryStorage`] is the in-process backend used by tests.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value;

use crate::app::ports::{StorageError, StoragePort};

type Document = BTreeMap<String, BTreeMap<String, Value>>;

pub struct FileStorage {
    path: PathBuf,
    doc: Document,
}

impl FileStorage {
    /// Open (or lazily create) the database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let doc = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Document::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupted(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("FileStorage: {} absent, starting empty", path.display());
                Document::new()
            }
            Err(e) => return Err(StorageError::IoError(format!("{}: {}", path.display(), e))),
        };
        debug!("FileStorage: opened {} ({} namespaces)", path.display(), doc.len());
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, doc: &Document) -> Result<(), StorageError> {
        let io = |e: std::io::Error| StorageError::IoError(format!("{}: {}", self.path.display(), e));
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| StorageError::Corrupted(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        file.sync_all().map_err(io)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(io)
    }
}

impl StoragePort for FileStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let value = self
            .doc
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .ok_or(StorageError::NotFound)?;
        serde_json::to_vec(value).map_err(|e| StorageError::Corrupted(e.to_string()))
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|e| StorageError::Corrupted(format!("value for {namespace}/{key} is not JSON: {e}")))?;
        let mut next = self.doc.clone();
        next.entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        self.persist(&next)?;
        self.doc = next;
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        if !self.exists(namespace, key) {
            return Ok(());
        }
        let mut next = self.doc.clone();
        if let Some(ns) = next.get_mut(namespace) {
            ns.remove(key);
            if ns.is_empty() {
                next.remove(namespace);
            }
        }
        self.persist(&next)?;
        self.doc = next;
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.doc.get(namespace).is_some_and(|ns| ns.contains_key(key))
    }
}

/// In-memory [`StoragePort`].  Values are opaque bytes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    store: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.store
            .get(&Self::composite_key(namespace, key))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&Self::composite_key(namespace, key))
    }
}
