//! File access seam for the plugin loader.
//!
//! The loader reads WASM modules through [`FileStore`] so tests can run
//! against an in-memory tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

/// Read-side file access used by the loader.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read a file's full contents.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if a file exists.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// List file names (not paths) directly under a directory.
    async fn list(&self, dir: &str) -> Result<Vec<String>>;
}

/// Local filesystem implementation.
pub struct FsFileStore {
    base_path: PathBuf,
}

impl FsFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        for component in Path::new(path).components() {
            if matches!(component, std::path::Component::ParentDir) {
                anyhow::bail!("parent directory components not allowed: {path}");
            }
        }

        Ok(self.base_path.join(path))
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full)
            .await
            .with_context(|| format!("failed to read {}", full.display()))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;

        Ok(fs::try_exists(&full).await?)
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let full = self.resolve(dir)?;
        if !fs::try_exists(&full).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&full)
            .await
            .with_context(|| format!("failed to read directory {}", full.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        Ok(names)
    }
}

/// In-memory implementation for tests.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, path: &str, data: impl Into<Vec<u8>>) {
        #[allow(clippy::unwrap_used)]
        self.files
            .write()
            .unwrap()
            .insert(path.to_string(), data.into());
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        #[allow(clippy::unwrap_used)]
        let files = self.files.read().unwrap();

        files
            .get(path)
            .cloned()
            .with_context(|| format!("file not found: {path}"))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        #[allow(clippy::unwrap_used)]
        let files = self.files.read().unwrap();

        Ok(files.contains_key(path))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        #[allow(clippy::unwrap_used)]
        let mut names: Vec<String> = self
            .files
            .read()
            .unwrap()
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(String::from)
            .collect();
        names.sort();

        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryFileStore::new();
        store.write("plugins/a.wasm", b"bytes".to_vec());

        assert!(store.exists("plugins/a.wasm").await.unwrap());
        assert_eq!(store.read("plugins/a.wasm").await.unwrap(), b"bytes");
        assert_eq!(store.list("plugins").await.unwrap(), vec!["a.wasm"]);
    }

    #[tokio::test]
    async fn memory_store_missing_file() {
        let store = MemoryFileStore::new();
        assert!(!store.exists("nope").await.unwrap());
        assert!(store.read("nope").await.is_err());
    }

    #[tokio::test]
    async fn fs_store_rejects_traversal() {
        let store = FsFileStore::new("/tmp");
        assert!(store.read("../etc/passwd").await.is_err());
    }
}
