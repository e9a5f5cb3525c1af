//! Post lifecycle: create, edit and delete, keeping records and image files
//! consistent.
//!
//! Ordering rules:
//! - an image is written and confirmed present before any record names it;
//! - a replaced image is removed only after the record stopped naming it;
//! - a deleted post loses its image first and its record second, and a
//!   failed removal leaves both in place.
//!
//! Unreferenced files left behind by a crash or a failed cleanup are
//! collected by the orphan sweeper.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;

use crate::domain::{Post, PostId, UploadMeta, User, ValidatedImage};
use crate::error::{DomainError, PersistenceFailure, RepoError, ValidationFailure};
use crate::ports::{FileArea, PostRepository, Removal};

use super::upload::UploadValidator;

pub const DEFAULT_CAPTION_MAX_CHARS: usize = 2200;

#[derive(Debug, Clone)]
pub struct PostPolicy {
    /// Reject new posts without an image.
    pub require_image: bool,
    pub caption_max_chars: usize,
}

impl Default for PostPolicy {
    fn default() -> Self {
        Self {
            require_image: true,
            caption_max_chars: DEFAULT_CAPTION_MAX_CHARS,
        }
    }
}

/// Input for a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub caption: String,
    pub image: Option<ValidatedImage>,
}

/// Requested edits. Absent or blank fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub caption: Option<String>,
    pub image: Option<ValidatedImage>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    files: Arc<dyn FileArea>,
    validator: UploadValidator,
    policy: PostPolicy,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        files: Arc<dyn FileArea>,
        validator: UploadValidator,
        policy: PostPolicy,
    ) -> Self {
        Self {
            posts,
            files,
            validator,
            policy,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Run an incoming upload through the validator.
    pub async fn accept_upload<S, E>(
        &self,
        meta: UploadMeta,
        body: S,
    ) -> Result<ValidatedImage, DomainError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let content_type = meta.content_type.clone();
        self.validator.accept(meta, body).await.map_err(|failure| {
            tracing::warn!(
                reason = failure.reason(),
                content_type = %content_type,
                "Upload rejected: {failure}"
            );
            DomainError::Validation(failure)
        })
    }

    /// Create a post owned by `actor`.
    pub async fn create(&self, actor: &User, draft: NewPost) -> Result<PostId, DomainError> {
        let caption = self.check_caption(&draft.caption)?;

        let image_filename = match &draft.image {
            Some(image) => Some(self.store_image(image).await?),
            None if self.policy.require_image => {
                tracing::warn!(actor = %actor.id, "Post rejected: no image attached");
                return Err(ValidationFailure::MissingImage.into());
            }
            None => None,
        };

        let post = Post::new(actor.id, caption, image_filename.clone());
        match self.posts.insert(post).await {
            Ok(saved) => {
                tracing::info!(
                    post_id = %saved.id,
                    actor = %actor.id,
                    image = ?saved.image_filename,
                    "Post created"
                );
                Ok(saved.id)
            }
            Err(e) => {
                tracing::error!(actor = %actor.id, error = %e, "Post insert failed");
                if let Some(filename) = &image_filename {
                    self.discard(filename).await;
                }
                Err(e.into())
            }
        }
    }

    /// Load a post for its owner, e.g. to fill an edit form.
    pub async fn load_for_edit(&self, actor: &User, post_id: PostId) -> Result<Post, DomainError> {
        self.load_owned(actor, post_id).await
    }

    /// Apply edits to a post owned by `actor`.
    ///
    /// A new image is confirmed on disk and committed to the record before the
    /// previous image is removed. With nothing to change this is a no-op.
    pub async fn update(
        &self,
        actor: &User,
        post_id: PostId,
        changes: PostChanges,
    ) -> Result<Post, DomainError> {
        let mut post = self.load_owned(actor, post_id).await?;
        let mut changed = false;

        if let Some(caption) = changes.caption.as_deref().filter(|c| !c.trim().is_empty()) {
            let caption = self.check_caption(caption)?;
            if caption != post.caption {
                post.caption = caption;
                changed = true;
            }
        }

        let mut fresh_image = None;
        let mut previous_image = None;
        if let Some(image) = &changes.image {
            let filename = self.store_image(image).await?;
            previous_image = post.image_filename.replace(filename.clone());
            fresh_image = Some(filename);
            changed = true;
        }

        if !changed {
            tracing::debug!(post_id = %post_id, "Update carried no changes");
            return Ok(post);
        }

        post.updated_at = Utc::now();
        let saved = match self.posts.update(post).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!(post_id = %post_id, error = %e, "Post update failed");
                if let Some(filename) = &fresh_image {
                    self.discard(filename).await;
                }
                return Err(match e {
                    RepoError::NotFound => DomainError::post_not_found(post_id),
                    other => other.into(),
                });
            }
        };

        if let Some(old) = previous_image {
            self.discard(&old).await;
        }

        tracing::info!(
            post_id = %post_id,
            actor = %actor.id,
            image_replaced = fresh_image.is_some(),
            "Post updated"
        );
        Ok(saved)
    }

    /// Delete a post owned by `actor` together with its image.
    ///
    /// The image goes first. If it cannot be removed the post is left
    /// untouched and the failure is reported.
    pub async fn delete(&self, actor: &User, post_id: PostId) -> Result<(), DomainError> {
        let post = self.load_owned(actor, post_id).await?;

        if let Some(filename) = &post.image_filename {
            match self.files.remove(filename).await {
                Ok(Removal::Removed) => {}
                Ok(Removal::AlreadyAbsent) => {
                    tracing::warn!(post_id = %post_id, file = %filename, "Image was already absent");
                }
                Err(e) => {
                    tracing::error!(
                        post_id = %post_id,
                        file = %filename,
                        error = %e,
                        "Image removal failed; post kept"
                    );
                    return Err(e.into());
                }
            }
        }

        match self.posts.delete(post_id).await {
            Ok(()) => {}
            Err(RepoError::NotFound) => return Err(DomainError::post_not_found(post_id)),
            Err(e) => {
                tracing::error!(
                    post_id = %post_id,
                    image = ?post.image_filename,
                    error = %e,
                    "Post delete failed after its image was removed"
                );
                return Err(e.into());
            }
        }

        tracing::info!(post_id = %post_id, actor = %actor.id, "Post deleted");
        Ok(())
    }

    async fn load_owned(&self, actor: &User, post_id: PostId) -> Result<Post, DomainError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(post_id))?;

        if !post.is_owned_by(actor.id) {
            tracing::warn!(
                post_id = %post_id,
                actor = %actor.id,
                owner = %post.author_id,
                "Ownership check failed"
            );
            return Err(DomainError::post_forbidden(post_id));
        }

        Ok(post)
    }

    fn check_caption(&self, caption: &str) -> Result<String, ValidationFailure> {
        let caption = caption.trim();
        if caption.chars().count() > self.policy.caption_max_chars {
            return Err(ValidationFailure::CaptionTooLong {
                max: self.policy.caption_max_chars,
            });
        }
        Ok(caption.to_string())
    }

    /// Write an image and confirm it is present.
    async fn store_image(&self, image: &ValidatedImage) -> Result<String, DomainError> {
        let filename = self.files.write(image).await.map_err(|e| {
            tracing::error!(file = image.file_name(), error = %e, "Image write failed");
            DomainError::from(e)
        })?;

        match self.files.exists(&filename).await {
            Ok(true) => Ok(filename),
            Ok(false) => {
                tracing::error!(file = %filename, "Image not present after write");
                Err(PersistenceFailure::NotPersisted(filename).into())
            }
            Err(e) => {
                tracing::error!(file = %filename, error = %e, "Image verification failed");
                Err(e.into())
            }
        }
    }

    /// Best-effort removal of a file no record refers to.
    async fn discard(&self, filename: &str) {
        if let Err(e) = self.files.remove(filename).await {
            tracing::warn!(file = %filename, error = %e, "Could not remove unreferenced image; left for the sweeper");
        }
    }
}
