//! Object storage access for the exported event logs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use revshare_core::{RevshareError, RevshareResult};
use tracing::debug;

/// Read-only view of a bucket of exported log objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every key in the bucket, sorted.
    async fn list_keys(&self) -> RevshareResult<Vec<String>>;

    /// Full contents of one object.
    async fn get(&self, key: &str) -> RevshareResult<Vec<u8>>;
}

/// A bucket mirrored on the local filesystem. Keys are `/`-separated
/// paths relative to the root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn list_keys(&self) -> RevshareResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(RevshareError::Storage(format!(
                "bucket root {} is not a directory",
                self.root.display()
            )));
        }

        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_of(&path) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        debug!(root = %self.root.display(), keys = keys.len(), "Bucket listed");
        Ok(keys)
    }

    async fn get(&self, key: &str) -> RevshareResult<Vec<u8>> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(RevshareError::Storage(format!("invalid object key {key:?}")));
        }
        let path = self.root.join(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| RevshareError::Storage(format!("{key}: {e}")))
    }
}
