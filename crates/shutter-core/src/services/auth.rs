//! Login, registration and per-request authentication.

use std::sync::Arc;

use crate::domain::{User, UserId};
use crate::error::{RepoError, ValidationFailure};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};

const DECOY_PASSWORD: &str = "shutter-decoy-password";
const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 32;

/// Why a request could not be tied to a user.
///
/// Callers treat the first three alike (back to login); they stay distinct
/// for logs and tests.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("No session token presented")]
    MissingToken,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Token subject {0} no longer exists")]
    UnknownSubject(UserId),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

impl AuthFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken(_) => "invalid_token",
            Self::UnknownSubject(_) => "unknown_subject",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// Signup input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_in: i64,
}

pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    decoy_hash: String,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Result<Self, AuthError> {
        let decoy_hash = passwords.hash(DECOY_PASSWORD)?;
        Ok(Self {
            users,
            passwords,
            tokens,
            decoy_hash,
        })
    }

    pub fn session_lifetime_secs(&self) -> i64 {
        self.tokens.expiration_seconds()
    }

    /// Create an account.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let username = registration.username.trim().to_string();
        let email = normalize_email(&registration.email);
        validate_registration(&username, &email, &registration.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Duplicate("email".to_string()));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::Duplicate("username".to_string()));
        }

        let password_hash = self.passwords.hash(&registration.password)?;
        let user = self
            .users
            .insert(User::new(username, email, password_hash))
            .await
            .map_err(|e| match e {
                RepoError::Constraint(what) => AuthError::Duplicate(what),
                other => AuthError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown email and wrong password both verify a hash and both fail with
    /// `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.users.find_by_email(&normalize_email(email)).await?;

        let hash = user
            .as_ref()
            .map_or(self.decoy_hash.as_str(), |u| u.password_hash.as_str());
        let matches = self.passwords.verify(password, hash)?;

        match user {
            Some(user) if matches => {
                let token = self.tokens.generate_token(user.id)?;
                tracing::info!(user_id = %user.id, "Login succeeded");
                Ok(Session {
                    token,
                    user,
                    expires_in: self.tokens.expiration_seconds(),
                })
            }
            _ => {
                tracing::info!("Login rejected: invalid credentials");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve the acting user from a presented token.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AuthFailure> {
        let result = self.resolve(token).await;
        if let Err(failure) = &result {
            tracing::debug!(kind = failure.kind(), error = %failure, "Authentication failed");
        }
        result
    }

    async fn resolve(&self, token: Option<&str>) -> Result<User, AuthFailure> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthFailure::MissingToken)?;

        let claims = self
            .tokens
            .validate_token(token)
            .map_err(|e| AuthFailure::InvalidToken(e.to_string()))?;

        match self.users.find_by_id(claims.user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthFailure::UnknownSubject(claims.user_id)),
            Err(e) => Err(AuthFailure::Unavailable(e.to_string())),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationFailure> {
    let invalid = |field, message| ValidationFailure::InvalidField { field, message };

    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(invalid("username", "must be 1 to 32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid(
            "username",
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(invalid("email", "is not a valid address")),
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("password", "must be at least 8 characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_rules() {
        assert!(validate_registration("ada", "ada@example.com", "correct horse").is_ok());
        assert!(validate_registration("", "ada@example.com", "correct horse").is_err());
        assert!(validate_registration("ada lovelace", "ada@example.com", "correct horse").is_err());
        assert!(validate_registration("ada", "ada.example.com", "correct horse").is_err());
        assert!(validate_registration("ada", "@example.com", "correct horse").is_err());
        assert!(validate_registration("ada", "ada@example.com", "short").is_err());
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
