//! Filesystem port - artifact の保存先（ローカル / オブジェクトストレージ）
//!
//! uri の解釈は実装に任せます。GC は存在確認と削除しか行いません。

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("filesystem operation on '{uri}' failed: {source}")]
pub struct FsError {
    pub uri: String,
    #[source]
    pub source: std::io::Error,
}

impl FsError {
    pub fn new(uri: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            uri: uri.into(),
            source,
        }
    }
}

#[async_trait]
pub trait Filesystem: Send + Sync {
    async fn exists(&self, uri: &str) -> Result<bool, FsError>;

    /// `false` for missing locations.
    async fn is_dir(&self, uri: &str) -> Result<bool, FsError>;

    /// Remove a single file.
    async fn remove(&self, uri: &str) -> Result<(), FsError>;

    /// Remove a directory and everything below it.
    async fn remove_recursive(&self, uri: &str) -> Result<(), FsError>;
}
