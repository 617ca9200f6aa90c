//! Media store boundary for instrument images and profile pictures.
//!
//! Services only ever hold a media *reference* (the stored file name). Objects
//! are written before the row that points at them and the old object is
//! removed only after the new reference has been committed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors raised by a media store.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Upload has no content")]
    EmptyUpload,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media store unavailable: {0}")]
    Unavailable(String),
}

/// An uploaded file as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }

    /// Builds a fresh collision-free reference for this upload.
    fn fresh_reference(&self) -> String {
        let id = Uuid::new_v4();
        match self.extension() {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }
}

/// Storage for uploaded media objects.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores an upload and returns its reference.
    async fn put(&self, upload: MediaUpload) -> Result<String, MediaError>;

    /// Removes the object behind `reference`. Missing objects are ignored.
    async fn delete(&self, reference: &str) -> Result<(), MediaError>;
}

/// Deletes `reference` without failing the caller.
///
/// Used once the owning row change has committed or been abandoned: the
/// outcome of the mutation is already decided, so a leftover object is only
/// logged.
pub(crate) async fn release<M: MediaStore + ?Sized>(media: &M, reference: &str) {
    if let Err(e) = media.delete(reference).await {
        tracing::warn!(%reference, error = %e, "failed to delete media object");
    }
}

/// Media store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, reference: &str) -> PathBuf {
        // References are generated file names; strip any directory part.
        let name = Path::new(reference)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        self.root.join(name)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, upload: MediaUpload) -> Result<String, MediaError> {
        if upload.bytes.is_empty() {
            return Err(MediaError::EmptyUpload);
        }
        tokio::fs::create_dir_all(&self.root).await?;

        let reference = upload.fresh_reference();
        tokio::fs::write(self.path_for(&reference), &upload.bytes).await?;
        tracing::debug!(%reference, "media stored");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), MediaError> {
        match tokio::fs::remove_file(self.path_for(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory media store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_on_put: Arc<RwLock<bool>>,
    fail_on_delete: Arc<RwLock<bool>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `put` calls fail.
    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    /// Makes subsequent `delete` calls fail and keep the object.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    pub async fn contains(&self, reference: &str) -> bool {
        self.objects.read().await.contains_key(reference)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn put(&self, upload: MediaUpload) -> Result<String, MediaError> {
        if *self.fail_on_put.read().await {
            return Err(MediaError::Unavailable("put disabled".to_string()));
        }
        if upload.bytes.is_empty() {
            return Err(MediaError::EmptyUpload);
        }
        let reference = upload.fresh_reference();
        self.objects
            .write()
            .await
            .insert(reference.clone(), upload.bytes);
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), MediaError> {
        if *self.fail_on_delete.read().await {
            return Err(MediaError::Unavailable("delete disabled".to_string()));
        }
        self.objects.write().await.remove(reference);
        Ok(())
    }
}
