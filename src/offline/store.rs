use super::{CachedResponse, OfflineError};
use crate::config::is_plain_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const INDEX_FILE: &str = "index.json";

/// Named cache generations, each mapping a request key to a stored response.
pub trait CacheStore: Send + Sync {
    /// Generation names, in sorted order.
    fn names(&self) -> impl Future<Output = Result<Vec<String>, OfflineError>> + Send;

    fn get(
        &self,
        generation: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<CachedResponse>, OfflineError>> + Send;

    /// Creates the generation on first use and replaces any existing entry.
    fn put(
        &self,
        generation: &str,
        key: &str,
        response: CachedResponse,
    ) -> impl Future<Output = Result<(), OfflineError>> + Send;

    /// Returns whether the generation existed.
    fn delete(&self, generation: &str) -> impl Future<Output = Result<bool, OfflineError>> + Send;
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    generations: Mutex<BTreeMap<String, BTreeMap<String, CachedResponse>>>,
}

impl CacheStore for MemoryCacheStore {
    async fn names(&self) -> Result<Vec<String>, OfflineError> {
        Ok(self.generations.lock().await.keys().cloned().collect())
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CachedResponse>, OfflineError> {
        Ok(self
            .generations
            .lock()
            .await
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, generation: &str, key: &str, response: CachedResponse) -> Result<(), OfflineError> {
        self.generations
            .lock()
            .await
            .entry(generation.to_string())
            .or_default()
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, generation: &str) -> Result<bool, OfflineError> {
        Ok(self.generations.lock().await.remove(generation).is_some())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DiskIndex {
    next: u64,
    entries: BTreeMap<String, DiskEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    status: u16,
    headers: Vec<(String, String)>,
    file: String,
}

/// One directory per generation holding `index.json` and one body file per
/// entry. The index is replaced atomically, so readers never see a torn write.
#[derive(Debug)]
pub struct DiskCacheStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &str) -> Result<PathBuf, OfflineError> {
        if !is_plain_name(generation) {
            return Err(OfflineError::InvalidGeneration(generation.to_string()));
        }
        Ok(self.root.join(generation))
    }

    async fn read_index(dir: &Path) -> Result<Option<DiskIndex>, OfflineError> {
        let path = dir.join(INDEX_FILE);
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| OfflineError::Index { path, source }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(OfflineError::Io { path, source }),
        }
    }

    async fn write_index(dir: &Path, index: &DiskIndex) -> Result<(), OfflineError> {
        let path = dir.join(INDEX_FILE);
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        let payload = serde_json::to_vec_pretty(index).map_err(|source| OfflineError::Index {
            path: path.clone(),
            source,
        })?;
        fs::write(&tmp, payload).await.map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, &path).await.map_err(|source| io_error(&path, source))
    }
}

impl CacheStore for DiskCacheStore {
    async fn names(&self) -> Result<Vec<String>, OfflineError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&self.root, source)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&self.root, source))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|kind| kind.is_dir())
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().to_string();
            if is_dir && is_plain_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CachedResponse>, OfflineError> {
        let dir = self.generation_dir(generation)?;
        let Some(index) = Self::read_index(&dir).await? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.get(key) else {
            return Ok(None);
        };

        let path = dir.join(&entry.file);
        let body = fs::read(&path).await.map_err(|source| io_error(&path, source))?;
        Ok(Some(CachedResponse {
            status: entry.status,
            headers: entry.headers.clone(),
            body,
        }))
    }

    async fn put(&self, generation: &str, key: &str, response: CachedResponse) -> Result<(), OfflineError> {
        let dir = self.generation_dir(generation)?;
        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(&dir).await.map_err(|source| io_error(&dir, source))?;
        let mut index = Self::read_index(&dir).await?.unwrap_or_default();

        let file = format!("{}.body", index.next);
        index.next += 1;
        let path = dir.join(&file);
        fs::write(&path, &response.body)
            .await
            .map_err(|source| io_error(&path, source))?;

        let replaced = index.entries.insert(
            key.to_string(),
            DiskEntry {
                status: response.status,
                headers: response.headers,
                file,
            },
        );
        Self::write_index(&dir, &index).await?;

        if let Some(old) = replaced {
            let _ = fs::remove_file(dir.join(old.file)).await;
        }
        Ok(())
    }

    async fn delete(&self, generation: &str) -> Result<bool, OfflineError> {
        let dir = self.generation_dir(generation)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(io_error(&dir, source)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> OfflineError {
    OfflineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("xuska_cache_{}_{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn disk_store_keeps_generations_apart() {
        let store = DiskCacheStore::new(scratch_root());
        assert!(store.names().await.unwrap().is_empty());

        let page = CachedResponse::new(200, "text/html", "<p>v1</p>");
        store.put("xuska-v1", "http://app/index.html", page.clone()).await.unwrap();
        store
            .put("xuska-v2", "http://app/index.html", CachedResponse::new(200, "text/html", "<p>v2</p>"))
            .await
            .unwrap();

        assert_eq!(store.names().await.unwrap(), vec!["xuska-v1", "xuska-v2"]);
        assert_eq!(store.get("xuska-v1", "http://app/index.html").await.unwrap(), Some(page));
        assert_eq!(store.get("xuska-v1", "http://app/missing").await.unwrap(), None);

        assert!(store.delete("xuska-v1").await.unwrap());
        assert!(!store.delete("xuska-v1").await.unwrap());
        assert_eq!(store.names().await.unwrap(), vec!["xuska-v2"]);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn disk_store_replaces_entries() {
        let store = DiskCacheStore::new(scratch_root());
        let key = "http://app/data.json";
        store.put("g", key, CachedResponse::new(200, "application/json", "{}")).await.unwrap();
        store
            .put("g", key, CachedResponse::new(200, "application/json", r#"{"a":1}"#))
            .await
            .unwrap();

        let hit = store.get("g", key).await.unwrap().unwrap();
        assert_eq!(hit.body, br#"{"a":1}"#);
        assert_eq!(hit.header("Content-Type"), Some("application/json"));

        let bodies = std::fs::read_dir(store.root().join("g"))
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .map(|entry| entry.file_name().to_string_lossy().ends_with(".body"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(bodies, 1);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn disk_store_rejects_path_like_generations() {
        let store = DiskCacheStore::new(scratch_root());
        let err = store
            .put("../escape", "k", CachedResponse::new(200, "text/plain", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineError::InvalidGeneration(_)));
    }
}
