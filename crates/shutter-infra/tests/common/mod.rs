//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tempfile::TempDir;

use shutter_core::domain::{Post, PostId, UploadMeta, User, UserId, ValidatedImage};
use shutter_core::error::{RepoError, StorageError};
use shutter_core::ports::{
    BaseRepository, FileArea, PostRepository, Removal, StoredFile, UserRepository,
};
use shutter_core::services::{PostPolicy, PostService, UploadValidator};
use shutter_infra::{InMemoryPostRepository, InMemoryUserRepository, LocalFileArea};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

/// Run bytes through the validator the way an upload handler would.
pub async fn upload(content_type: &str, name: &str, body: &'static [u8]) -> ValidatedImage {
    let meta = UploadMeta {
        content_type: content_type.to_string(),
        original_name: Some(name.to_string()),
    };
    let chunks = stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(body))]);
    UploadValidator::default()
        .accept(meta, chunks)
        .await
        .expect("fixture upload is valid")
}

pub async fn png() -> ValidatedImage {
    upload("image/png", "photo.png", PNG).await
}

pub async fn jpeg() -> ValidatedImage {
    upload("image/jpeg", "photo.jpg", JPEG).await
}

pub fn user(name: &str) -> User {
    User::new(
        name.to_string(),
        format!("{name}@example.com"),
        "unused-hash".to_string(),
    )
}

/// Post store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyPostStore {
    pub inner: InMemoryPostRepository,
    pub fail_writes: AtomicBool,
}

impl FlakyPostStore {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub async fn inner_count(&self) -> u64 {
        self.inner.count().await.expect("count posts")
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Connection("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRepository<Post, PostId> for FlakyPostStore {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        self.check()?;
        self.inner.insert(post).await
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        self.check()?;
        self.inner.update(post).await
    }

    async fn delete(&self, id: PostId) -> Result<(), RepoError> {
        self.check()?;
        self.inner.delete(id).await
    }
}

#[async_trait]
impl PostRepository for FlakyPostStore {
    async fn count(&self) -> Result<u64, RepoError> {
        self.inner.count().await
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError> {
        self.inner.list_page(offset, limit).await
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64, RepoError> {
        self.inner.count_by_author(author_id).await
    }

    async fn list_page_by_author(
        &self,
        author_id: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        self.inner.list_page_by_author(author_id, offset, limit).await
    }

    async fn referenced_filenames(&self) -> Result<HashSet<String>, RepoError> {
        self.inner.referenced_filenames().await
    }
}

/// File area that can be told to lose writes or refuse removals.
pub struct FlakyFiles {
    pub inner: LocalFileArea,
    pub lose_writes: AtomicBool,
    pub fail_removes: AtomicBool,
}

#[async_trait]
impl FileArea for FlakyFiles {
    async fn write(&self, image: &ValidatedImage) -> Result<String, StorageError> {
        if self.lose_writes.load(Ordering::SeqCst) {
            // Reports success but nothing reaches the disk.
            return Ok(image.file_name().to_string());
        }
        self.inner.write(image).await
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        self.inner.exists(filename).await
    }

    async fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.read(filename).await
    }

    async fn remove(&self, filename: &str) -> Result<Removal, StorageError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("permission denied".to_string()));
        }
        self.inner.remove(filename).await
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        self.inner.list().await
    }
}

/// A post service over in-memory stores and a temporary upload directory.
pub struct Harness {
    pub dir: TempDir,
    pub users: Arc<InMemoryUserRepository>,
    pub posts: Arc<FlakyPostStore>,
    pub files: Arc<FlakyFiles>,
    pub service: PostService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(PostPolicy::default()).await
    }

    pub async fn with_policy(policy: PostPolicy) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let area = LocalFileArea::open(dir.path()).await.expect("open file area");
        let users = Arc::new(InMemoryUserRepository::new());
        let posts = Arc::new(FlakyPostStore::default());
        let files = Arc::new(FlakyFiles {
            inner: area,
            lose_writes: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        });

        let service = PostService::new(
            posts.clone(),
            files.clone(),
            UploadValidator::default(),
            policy,
        );

        Self {
            dir,
            users,
            posts,
            files,
            service,
        }
    }

    pub async fn register(&self, name: &str) -> User {
        self.users.insert(user(name)).await.expect("insert user")
    }

    pub async fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .list()
            .await
            .expect("list files")
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        names
    }

    pub async fn post(&self, id: PostId) -> Option<Post> {
        self.posts.find_by_id(id).await.expect("find post")
    }
}
