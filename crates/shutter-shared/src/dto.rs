//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Signup form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `?page=N` on listing routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    /// The requested page. Missing or unparsable means page 1.
    pub fn number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

/// Public URL of a stored image.
pub fn image_url(filename: &str) -> String {
    format!("/uploads/{filename}")
}

/// A post as shown in a feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: String,
    pub can_edit: bool,
}

/// One page of posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_posts: u64,
}

/// A post loaded for editing by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPostResponse {
    pub id: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
