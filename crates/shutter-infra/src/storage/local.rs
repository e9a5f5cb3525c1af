//! Directory-backed file area.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use shutter_core::domain::{ValidatedImage, is_valid_stored_name};
use shutter_core::error::StorageError;
use shutter_core::ports::{FileArea, Removal, StoredFile};

const STAGING_DIR: &str = ".staging";

/// Stores each image as a flat file at `{root}/{name}`.
///
/// Writes land in `{root}/.staging` first and are renamed into place once
/// synced, so a reader never sees a partial file under a stored name.
pub struct LocalFileArea {
    root: PathBuf,
    staging: PathBuf,
}

impl LocalFileArea {
    /// Open (creating if needed) the area rooted at `root`.
    ///
    /// Leftover staging files from an interrupted write are purged.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        let mut entries = fs::read_dir(&staging).await?;
        let mut purged = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            if fs::remove_file(entry.path()).await.is_ok() {
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::warn!(purged, "Purged interrupted uploads from staging");
        }

        tracing::info!("Upload directory: {}", root.display());
        Ok(Self { root, staging })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_stored_name(filename) {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }

    async fn write_staged(&self, staged: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(staged)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

#[async_trait]
impl FileArea for LocalFileArea {
    async fn write(&self, image: &ValidatedImage) -> Result<String, StorageError> {
        let name = image.file_name().to_string();
        let target = self.path_for(&name)?;

        if fs::try_exists(&target).await? {
            return Err(StorageError::Io(format!("{name} already exists")));
        }

        let staged = self.staging.join(format!("{}.part", Uuid::new_v4().simple()));
        let result = match self.write_staged(&staged, image.bytes()).await {
            Ok(()) => fs::rename(&staged, &target).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            let _ = fs::remove_file(&staged).await;
            return Err(e.into());
        }

        tracing::debug!(file = %name, bytes = image.len(), "Stored image");
        Ok(name)
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.path_for(filename)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(filename)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, filename: &str) -> Result<Removal, StorageError> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(file = %filename, "Removed image");
                Ok(Removal::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %filename, "Image already gone");
                Ok(Removal::AlreadyAbsent)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_stored_name(&name) {
                continue;
            }
            if let Some(file) = listed_file(name, entry.metadata().await)? {
                files.push(file);
            }
        }

        Ok(files)
    }
}

/// A directory entry as a listed file. Entries removed while the listing
/// runs are skipped, as are non-files.
fn listed_file(
    name: String,
    meta: std::io::Result<std::fs::Metadata>,
) -> Result<Option<StoredFile>, StorageError> {
    let meta = match meta {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Ok(None);
    }
    let modified: DateTime<Utc> = meta.modified()?.into();
    Ok(Some(StoredFile { name, modified }))
}
