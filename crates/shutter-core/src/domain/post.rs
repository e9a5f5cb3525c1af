use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostId, UserId};

/// Post entity - an image with a caption, owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub caption: String,
    /// Name inside the file area. Must exist there whenever it is `Some`.
    pub image_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(author_id: UserId, caption: String, image_filename: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PostId::generate(),
            author_id,
            caption,
            image_filename,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.author_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_is_identity_equality() {
        let owner = UserId::generate();
        let post = Post::new(owner, "hello".to_string(), None);

        assert!(post.is_owned_by(owner));
        assert!(!post.is_owned_by(UserId::generate()));
    }
}
