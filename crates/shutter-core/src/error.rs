//! Domain-level error types.

use thiserror::Error;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Not the owner of {entity_type} {id}")]
    Forbidden { entity_type: &'static str, id: String },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceFailure),
}

impl DomainError {
    pub fn post_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "post",
            id: id.to_string(),
        }
    }

    pub fn post_forbidden(id: impl ToString) -> Self {
        Self::Forbidden {
            entity_type: "post",
            id: id.to_string(),
        }
    }
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        Self::Persistence(PersistenceFailure::Store(err))
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        Self::Persistence(PersistenceFailure::Files(err))
    }
}

/// Rejected input. Always the client's fault, never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("Unsupported file type: {0}. Only jpeg, png, gif and webp images are allowed")]
    UnsupportedType(String),

    #[error("File too large. Maximum size: {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File content does not match declared type {declared}")]
    ContentMismatch { declared: &'static str },

    #[error("Upload error: {0}")]
    Malformed(String),

    #[error("An image file is required")]
    MissingImage,

    #[error("Caption exceeds {max} characters")]
    CaptionTooLong { max: usize },

    #[error("{field}: {message}")]
    InvalidField {
        field: &'static str,
        message: &'static str,
    },
}

impl ValidationFailure {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "unsupported_type",
            Self::TooLarge { .. } => "too_large",
            Self::EmptyFile => "empty_file",
            Self::ContentMismatch { .. } => "content_mismatch",
            Self::Malformed(_) => "malformed_upload",
            Self::MissingImage => "missing_image",
            Self::CaptionTooLong { .. } => "caption_too_long",
            Self::InvalidField { .. } => "invalid_field",
        }
    }
}

/// Store or file-area failure. The operation was aborted.
#[derive(Debug, Error)]
pub enum PersistenceFailure {
    #[error("Post store error: {0}")]
    Store(#[from] RepoError),

    #[error("File area error: {0}")]
    Files(#[from] StorageError),

    #[error("File {0} not present after write")]
    NotPersisted(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// File area errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid stored file name: {0}")]
    InvalidName(String),

    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
