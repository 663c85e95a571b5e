//! JSON file implementation of the CacheStore trait.
//!
//! This is the production backend. The cache is a single UTF-8 JSON object
//! mapping `name -> url`, replaced atomically on every save.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use camsync_core::Cache;

use crate::error::{Result, StoreError};
use crate::traits::CacheStore;

/// File-backed cache store.
///
/// Saves go to a sibling `<file>.tmp`, are fsynced, then renamed over the
/// target. Rename within one directory is atomic on POSIX filesystems.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted cache.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used for the in-progress write.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("cache"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn load(&self) -> Cache {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cache file yet, starting empty");
                return Cache::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache file unreadable, starting empty");
                return Cache::new();
            }
        };

        match serde_json::from_slice::<Cache>(&bytes) {
            Ok(cache) => {
                debug!(path = %self.path.display(), entries = cache.len(), "cache loaded");
                cache
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache file corrupt, starting empty");
                Cache::new()
            }
        }
    }

    async fn save(&self, cache: &Cache) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error(parent))?;
        }

        let json = serde_json::to_vec_pretty(cache)?;
        let tmp = self.temp_path();

        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_error(&tmp))?;
        file.write_all(&json).await.map_err(io_error(&tmp))?;
        file.sync_all().await.map_err(io_error(&tmp))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        debug!(path = %self.path.display(), entries = cache.len(), "cache saved");
        Ok(())
    }
}
