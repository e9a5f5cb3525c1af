use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{PostId, UserId};

/// A post as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub caption: String,
    pub image_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    /// True when the viewer owns the post.
    pub can_edit: bool,
}

/// One page of the feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_posts: u64,
}
