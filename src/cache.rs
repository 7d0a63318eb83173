use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SubfetchError};

/// On-disk key-value store for provider lookups, one JSON file per entry.
///
/// A disabled store answers every get with a miss and swallows every put,
/// so providers never need to branch on cache availability.
#[derive(Debug)]
pub struct CacheStore {
    dir: Option<PathBuf>,
}

impl CacheStore {
    /// Open the store at `dir`, creating the directory when missing.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            SubfetchError::InvalidConfiguration(format!(
                "Cannot create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir: Some(dir.to_path_buf()),
        })
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Look up a cached value. Unreadable or unparsable entries count as
    /// misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key)?;
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!("Cache hit for {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a value under `key`. Written to a temporary file first and
    /// renamed into place, so concurrent readers never see a partial entry.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(());
        };
        let path = dir.join(entry_file_name(key));

        let file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&file, value)?;
        file.persist(&path)
            .map_err(|e| SubfetchError::Io(e.error))?;

        debug!("Cached entry for {}", key);
        Ok(())
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(entry_file_name(key)))
    }
}

fn entry_file_name(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}.json", hasher.finish())
}
