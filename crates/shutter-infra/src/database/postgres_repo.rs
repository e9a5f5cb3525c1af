//! PostgreSQL repository implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select};

use shutter_core::domain::{Post, User, UserId};
use shutter_core::error::RepoError;
use shutter_core::ports::{PostRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, read_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// Mask an email for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(read_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(read_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().map(UserId::as_uuid)))
            .all(&self.db)
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// Newest first; the id breaks ties between equal timestamps.
fn newest_first(select: Select<PostEntity>) -> Select<PostEntity> {
    select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn count(&self) -> Result<u64, RepoError> {
        PostEntity::find().count(&self.db).await.map_err(read_error)
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<Post>, RepoError> {
        let result = newest_first(PostEntity::find())
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count_by_author(&self, author_id: UserId) -> Result<u64, RepoError> {
        PostEntity::find()
            .filter(post::Column::AuthorId.eq(author_id.as_uuid()))
            .count(&self.db)
            .await
            .map_err(read_error)
    }

    async fn list_page_by_author(
        &self,
        author_id: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let query = PostEntity::find().filter(post::Column::AuthorId.eq(author_id.as_uuid()));
        let result = newest_first(query)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(read_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn referenced_filenames(&self) -> Result<HashSet<String>, RepoError> {
        let names: Vec<Option<String>> = PostEntity::find()
            .select_only()
            .column(post::Column::ImageFilename)
            .filter(post::Column::ImageFilename.is_not_null())
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(read_error)?;

        Ok(names.into_iter().flatten().collect())
    }
}
