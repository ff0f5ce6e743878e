//! Artifact store abstraction and a directory-backed implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ArtifactError;

/// Source of model artifacts addressed by `/`-separated keys.
///
/// Keys look like `{collection}/{file}`. Implementations make a fetched
/// artifact available as a local file and return its path.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, ArtifactError>;

    /// Make the artifact available locally.
    ///
    /// Returns [`ArtifactError::NotFound`] if there is nothing under `key`.
    async fn fetch(&self, key: &str) -> Result<PathBuf, ArtifactError>;

    /// Human-readable location of `key`, for logs.
    fn locate(&self, key: &str) -> String;
}

/// Artifacts already on local disk under a root directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn exists(&self, key: &str) -> Result<bool, ArtifactError> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ArtifactError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn fetch(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        if !self.exists(key).await? {
            return Err(ArtifactError::NotFound(self.locate(key)));
        }
        Ok(self.path_for(key))
    }

    fn locate(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}
