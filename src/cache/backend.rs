//! Cache backend implementations.
//!
//! Backends store final response text keyed by [`CacheKey::hash`]. Every
//! backend is safe to share between concurrent calls.

use super::key::CacheKey;
use crate::{Error, Result};
use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;
    async fn set(&self, key: &CacheKey, value: &str) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// In-memory LRU cache.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryCache {
    /// `max_entries` of zero is treated as one.
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::cache("memory cache lock poisoned"))
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        Ok(self.lock()?.get(&key.hash).cloned())
    }
    async fn set(&self, key: &CacheKey, value: &str) -> Result<()> {
        self.lock()?.put(key.hash.clone(), value.to_string());
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.lock()?.pop(&key.hash).is_some())
    }
    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: String,
}

/// Append-only JSONL cache on disk.
///
/// Each line is one `{"key", "value"}` record; when a key appears more than
/// once the last line wins. The file is read on first use and kept in memory.
pub struct FileCache {
    path: PathBuf,
    entries: tokio::sync::Mutex<Option<HashMap<String, String>>>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: tokio::sync::Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<HashMap<String, String>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(Error::cache(format!("read {}: {}", path.display(), e))),
        };
        let mut entries = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FileEntry>(line) {
                Ok(e) => {
                    entries.insert(e.key, e.value);
                }
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping corrupt cache line"
                ),
            }
        }
        Ok(entries)
    }

    fn encode(records: &[FileEntry]) -> Result<String> {
        let mut buf = String::new();
        for r in records {
            buf.push_str(&serde_json::to_string(r)?);
            buf.push('\n');
        }
        Ok(buf)
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::cache(format!("create {}: {}", dir.display(), e)))?;
        }
        Ok(())
    }

    /// Replace the file contents: write a sibling temp file, then rename it
    /// over the cache file. The old file is intact until the rename.
    async fn rewrite(&self, records: &[FileEntry]) -> Result<()> {
        self.ensure_dir().await?;
        let buf = Self::encode(records)?;
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        tokio::fs::write(&tmp, buf.as_bytes())
            .await
            .map_err(|e| Error::cache(format!("write {}: {}", tmp.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::cache(format!(
                "rename {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    async fn append(&self, records: &[FileEntry]) -> Result<()> {
        self.ensure_dir().await?;
        let buf = Self::encode(records)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::cache(format!("open {}: {}", self.path.display(), e)))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| Error::cache(format!("write {}: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| Error::cache(format!("flush {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        Ok(guard.as_ref().and_then(|m| m.get(&key.hash).cloned()))
    }

    async fn set(&self, key: &CacheKey, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let record = FileEntry {
            key: key.hash.clone(),
            value: value.to_string(),
        };
        self.append(std::slice::from_ref(&record)).await?;
        if let Some(map) = guard.as_mut() {
            map.insert(record.key, record.value);
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut guard = self.entries.lock().await;
        let mut map = match guard.take() {
            Some(m) => m,
            None => Self::load(&self.path).await?,
        };
        let removed = map.remove(&key.hash).is_some();
        if removed {
            let records: Vec<FileEntry> = map
                .iter()
                .map(|(k, v)| FileEntry {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect();
            // On failure the cached map is dropped and reloaded from disk.
            self.rewrite(&records).await?;
        }
        *guard = Some(map);
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.entries.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::cache(format!(
                    "remove {}: {}",
                    self.path.display(),
                    e
                )))
            }
        }
        *guard = Some(HashMap::new());
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        Ok(guard.as_ref().map(|m| m.len()).unwrap_or(0))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<String>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &str) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
