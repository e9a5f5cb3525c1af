use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// User entity - a registered account.
///
/// Immutable once created; posts refer to it through [`UserId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamp.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: UserId::generate(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}
