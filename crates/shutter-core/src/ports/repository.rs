use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{Post, PostId, User, UserId};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Replace an existing entity as one row update. `NotFound` if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. `NotFound` if nothing was deleted.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Credential store.
#[async_trait]
pub trait UserRepository: BaseRepository<User, UserId> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Resolve many ids at once. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepoError>;
}

/// Post store.
///
/// Listings are ordered newest first, ties broken by id descending.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, PostId> {
    async fn count(&self) -> Result<u64, RepoError>;

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError>;

    async fn count_by_author(&self, author_id: UserId) -> Result<u64, RepoError>;

    async fn list_page_by_author(
        &self,
        author_id: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Every image filename currently referenced by a post.
    async fn referenced_filenames(&self) -> Result<HashSet<String>, RepoError>;
}
