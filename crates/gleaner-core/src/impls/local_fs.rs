//! LocalFilesystem - ローカルディスク上の artifact
//!
//! uri はパスそのもの、または `file://` 付きのパスとして扱います。

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ports::{Filesystem, FsError};

const FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem {
    /// Relative uris resolve against this directory when set.
    root: Option<PathBuf>,
}

impl LocalFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn exists(&self, uri: &str) -> Result<bool, FsError> {
        tokio::fs::try_exists(self.resolve(uri))
            .await
            .map_err(|e| FsError::new(uri, e))
    }

    async fn is_dir(&self, uri: &str) -> Result<bool, FsError> {
        match tokio::fs::metadata(self.resolve(uri)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::new(uri, e)),
        }
    }

    async fn remove(&self, uri: &str) -> Result<(), FsError> {
        tokio::fs::remove_file(self.resolve(uri))
            .await
            .map_err(|e| FsError::new(uri, e))
    }

    async fn remove_recursive(&self, uri: &str) -> Result<(), FsError> {
        tokio::fs::remove_dir_all(self.resolve(uri))
            .await
            .map_err(|e| FsError::new(uri, e))
    }
}
