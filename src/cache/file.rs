//! File-backed cache persistence.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;

use crate::cache::{CacheError, LocalCache};

/// Cache mirrored to a JSON object on disk.
#[derive(Debug)]
pub struct FileCache {
    inner: DashMap<String, String>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCache {
    /// Open the cache at `path`, loading existing entries if the file exists.
    ///
    /// A file that cannot be parsed is ignored and will be overwritten on
    /// the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let cache = Self {
            inner: DashMap::new(),
            path,
            write_lock: Mutex::new(()),
        };

        if cache.path.exists() {
            let file = File::open(&cache.path)?;
            let reader = BufReader::new(file);
            match serde_json::from_reader::<_, HashMap<String, String>>(reader) {
                Ok(map) => {
                    for (k, v) in map {
                        cache.inner.insert(k, v);
                    }
                    tracing::info!(path = ?cache.path, entries = cache.inner.len(), "Loaded local cache");
                }
                Err(e) => {
                    tracing::warn!(path = ?cache.path, error = %e, "Ignoring unreadable cache file");
                }
            }
        }
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_to_file(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().expect("cache write lock poisoned");
        let map: HashMap<String, String> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = ?self.path, entries = map.len(), "Saved local cache");
        Ok(())
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value.to_string());
        self.save_to_file()
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        self.save_to_file()
    }
}
