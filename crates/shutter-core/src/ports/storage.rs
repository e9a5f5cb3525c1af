//! File area port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ValidatedImage;
use crate::error::StorageError;

/// Outcome of a removal. Both are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

/// A file present in the area.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// Directory of image files. Authoritative for whether an image exists.
#[async_trait]
pub trait FileArea: Send + Sync {
    /// Persist a validated image under its generated name and return that name.
    ///
    /// Atomic: either the whole file is visible under the name, or the call
    /// fails and nothing is.
    async fn write(&self, image: &ValidatedImage) -> Result<String, StorageError>;

    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    async fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError>;

    /// Idempotent: an absent file is reported, not an error.
    async fn remove(&self, filename: &str) -> Result<Removal, StorageError>;

    async fn list(&self) -> Result<Vec<StoredFile>, StorageError>;
}
