//! Authentication ports.

use crate::domain::UserId;

/// Claims carried by a verified session token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub issued_at: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens. Stateless: validity is signature plus expiry.
pub trait TokenService: Send + Sync {
    /// Issue a token for a user.
    fn generate_token(&self, user_id: UserId) -> Result<String, AuthError>;

    /// Verify signature, issuer and expiry, and decode the claims.
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Lifetime of newly issued tokens.
    fn expiration_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Hashing error: {0}")]
    HashingError(String),

    #[error("Invalid registration: {0}")]
    Validation(#[from] crate::error::ValidationFailure),

    #[error("Already registered: {0}")]
    Duplicate(String),

    #[error("Credential store error: {0}")]
    Store(#[from] crate::error::RepoError),
}
