//! Paginated, author-resolved post listings.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{FeedPage, Post, PostView, User, UserId};
use crate::error::DomainError;
use crate::ports::{PostRepository, UserRepository};

pub const DEFAULT_PAGE_SIZE: u64 = 4;

/// Shown when a post's author can no longer be resolved.
pub const DELETED_AUTHOR: &str = "deleted-user";

pub struct FeedAssembler {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    page_size: u64,
}

impl FeedAssembler {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        page_size: u64,
    ) -> Self {
        Self {
            posts,
            users,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// The global feed, newest first. Pages below 1 are clamped to 1; pages
    /// past the end are empty.
    pub async fn list(&self, viewer: &User, page: i64) -> Result<FeedPage, DomainError> {
        let total = self.posts.count().await?;
        let window = PageWindow::new(page, self.page_size, total);

        let posts = if window.is_past_end() {
            Vec::new()
        } else {
            self.posts.list_page(window.offset, self.page_size).await?
        };

        self.assemble(viewer, posts, window).await
    }

    /// One author's posts, same paging rules as [`FeedAssembler::list`].
    pub async fn list_by_author(
        &self,
        viewer: &User,
        username: &str,
        page: i64,
    ) -> Result<FeedPage, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity_type: "user",
                id: username.to_string(),
            })?;

        let total = self.posts.count_by_author(author.id).await?;
        let window = PageWindow::new(page, self.page_size, total);

        let posts = if window.is_past_end() {
            Vec::new()
        } else {
            self.posts
                .list_page_by_author(author.id, window.offset, self.page_size)
                .await?
        };

        self.assemble(viewer, posts, window).await
    }

    async fn assemble(
        &self,
        viewer: &User,
        posts: Vec<Post>,
        window: PageWindow,
    ) -> Result<FeedPage, DomainError> {
        let mut author_ids: Vec<UserId> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<UserId, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.users
                .find_by_ids(&author_ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u.username))
                .collect()
        };

        let views = posts
            .into_iter()
            .map(|post| {
                let author_username = authors.get(&post.author_id).cloned().unwrap_or_else(|| {
                    tracing::warn!(post_id = %post.id, author = %post.author_id, "Post author not found");
                    DELETED_AUTHOR.to_string()
                });
                PostView {
                    id: post.id,
                    can_edit: post.is_owned_by(viewer.id),
                    author_id: post.author_id,
                    author_username,
                    caption: post.caption,
                    image_filename: post.image_filename,
                    created_at: post.created_at,
                }
            })
            .collect();

        Ok(FeedPage {
            posts: views,
            current_page: window.current_page,
            total_pages: window.total_pages,
            total_posts: window.total,
        })
    }
}

/// Page arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    current_page: u64,
    total_pages: u64,
    offset: u64,
    total: u64,
}

impl PageWindow {
    fn new(page: i64, page_size: u64, total: u64) -> Self {
        let current_page = u64::try_from(page).unwrap_or(0).max(1);
        let total_pages = total.div_ceil(page_size).max(1);
        Self {
            current_page,
            total_pages,
            offset: (current_page - 1).saturating_mul(page_size),
            total,
        }
    }

    fn is_past_end(&self) -> bool {
        self.offset >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_for_ten_posts() {
        let first = PageWindow::new(1, 4, 10);
        assert_eq!(first.offset, 0);
        assert_eq!(first.total_pages, 3);

        let third = PageWindow::new(3, 4, 10);
        assert_eq!(third.offset, 8);
        assert!(!third.is_past_end());

        let fourth = PageWindow::new(4, 4, 10);
        assert!(fourth.is_past_end());
        assert_eq!(fourth.total_pages, 3);
    }

    #[test]
    fn test_page_window_clamps_low_pages() {
        assert_eq!(PageWindow::new(0, 4, 10).current_page, 1);
        assert_eq!(PageWindow::new(-7, 4, 10).current_page, 1);
    }

    #[test]
    fn test_empty_feed_has_one_page() {
        let window = PageWindow::new(1, 4, 0);
        assert_eq!(window.total_pages, 1);
        assert!(window.is_past_end());
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let window = PageWindow::new(i64::MAX, 4, 10);
        assert!(window.is_past_end());
    }
}
