//! In-memory filesystem for tests and dry runs.
//!
//! Paths are plain strings. A directory `d` contains every path that starts
//! with `d/`.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{Filesystem, FsError};

/// How a removal goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// Removal fails and the path stays.
    Protected,
    /// Removal fails but the path is gone afterwards.
    Vanishing,
}

#[derive(Default)]
struct InMemoryFsState {
    files: BTreeSet<String>,
    dirs: BTreeSet<String>,
    protected: BTreeSet<String>,
    vanishing: BTreeSet<String>,
    failing_exists: BTreeSet<String>,
    failing_is_dir: BTreeSet<String>,
    /// Successful removals, in call order.
    removed: Vec<String>,
}

impl InMemoryFsState {
    fn failure(&self, uri: &str) -> Option<Failure> {
        if self.protected.contains(uri) {
            Some(Failure::Protected)
        } else if self.vanishing.contains(uri) {
            Some(Failure::Vanishing)
        } else {
            None
        }
    }

    fn drop_tree(&mut self, uri: &str) {
        let prefix = format!("{uri}/");
        self.files.retain(|p| p != uri && !p.starts_with(&prefix));
        self.dirs.retain(|p| p != uri && !p.starts_with(&prefix));
    }
}

/// In-memory `Filesystem` with injectable removal failures.
#[derive(Clone, Default)]
pub struct InMemoryFilesystem {
    state: Arc<Mutex<InMemoryFsState>>,
}

impl InMemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_file(&self, uri: impl Into<String>) {
        self.state.lock().await.files.insert(uri.into());
    }

    pub async fn add_dir(&self, uri: impl Into<String>) {
        self.state.lock().await.dirs.insert(uri.into());
    }

    /// Removing `uri` fails and leaves it in place.
    pub async fn protect(&self, uri: impl Into<String>) {
        self.state.lock().await.protected.insert(uri.into());
    }

    /// Removing `uri` reports an error, yet the path disappears.
    pub async fn vanish_on_remove(&self, uri: impl Into<String>) {
        self.state.lock().await.vanishing.insert(uri.into());
    }

    /// `exists(uri)` returns an error.
    pub async fn fail_exists(&self, uri: impl Into<String>) {
        self.state.lock().await.failing_exists.insert(uri.into());
    }

    /// `is_dir(uri)` returns an error.
    pub async fn fail_is_dir(&self, uri: impl Into<String>) {
        self.state.lock().await.failing_is_dir.insert(uri.into());
    }

    pub async fn contains(&self, uri: &str) -> bool {
        let state = self.state.lock().await;
        state.files.contains(uri) || state.dirs.contains(uri)
    }

    /// Paths removed successfully so far.
    pub async fn removed(&self) -> Vec<String> {
        self.state.lock().await.removed.clone()
    }

    async fn remove_path(&self, uri: &str, recursive: bool) -> Result<(), FsError> {
        let mut state = self.state.lock().await;
        match state.failure(uri) {
            Some(Failure::Protected) => {
                return Err(FsError::new(
                    uri,
                    io::Error::new(io::ErrorKind::PermissionDenied, "protected path"),
                ));
            }
            Some(Failure::Vanishing) => {
                state.drop_tree(uri);
                return Err(FsError::new(
                    uri,
                    io::Error::other("removal interrupted"),
                ));
            }
            None => {}
        }

        let present = if recursive {
            state.dirs.contains(uri)
        } else {
            state.files.contains(uri)
        };
        if !present {
            return Err(FsError::new(
                uri,
                io::Error::new(io::ErrorKind::NotFound, "no such path"),
            ));
        }

        if recursive {
            state.drop_tree(uri);
        } else {
            state.files.remove(uri);
        }
        state.removed.push(uri.to_string());
        Ok(())
    }
}

#[async_trait]
impl Filesystem for InMemoryFilesystem {
    async fn exists(&self, uri: &str) -> Result<bool, FsError> {
        let state = self.state.lock().await;
        if state.failing_exists.contains(uri) {
            return Err(FsError::new(uri, io::Error::other("exists check failed")));
        }
        Ok(state.files.contains(uri) || state.dirs.contains(uri))
    }

    async fn is_dir(&self, uri: &str) -> Result<bool, FsError> {
        let state = self.state.lock().await;
        if state.failing_is_dir.contains(uri) {
            return Err(FsError::new(uri, io::Error::other("stat failed")));
        }
        Ok(state.dirs.contains(uri))
    }

    async fn remove(&self, uri: &str) -> Result<(), FsError> {
        self.remove_path(uri, false).await
    }

    async fn remove_recursive(&self, uri: &str) -> Result<(), FsError> {
        self.remove_path(uri, true).await
    }
}
