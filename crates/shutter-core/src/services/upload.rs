//! Upload validation.

use std::fmt::Display;
use std::pin::pin;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt};

use crate::domain::{ImageKind, UploadMeta, ValidatedImage};
use crate::error::ValidationFailure;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// What the validator lets through.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed: Vec<ImageKind>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed: ImageKind::ALL.to_vec(),
        }
    }
}

/// Checks an incoming upload before anything reaches the file area.
#[derive(Debug, Clone, Default)]
pub struct UploadValidator {
    policy: UploadPolicy,
}

impl UploadValidator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Check the declared type. No bytes are read.
    pub fn admit(&self, meta: &UploadMeta) -> Result<ImageKind, ValidationFailure> {
        ImageKind::from_mime(&meta.content_type)
            .filter(|kind| self.policy.allowed.contains(kind))
            .ok_or_else(|| ValidationFailure::UnsupportedType(meta.content_type.clone()))
    }

    /// Validate and buffer an upload.
    ///
    /// The size limit is enforced per chunk, so an oversized body is abandoned
    /// as soon as it crosses the limit rather than after it is fully read.
    pub async fn accept<S, E>(
        &self,
        meta: UploadMeta,
        body: S,
    ) -> Result<ValidatedImage, ValidationFailure>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let kind = self.admit(&meta)?;
        let limit = self.policy.max_bytes;

        let mut body = pin!(body);
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ValidationFailure::Malformed(e.to_string()))?;
            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(ValidationFailure::TooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            return Err(ValidationFailure::EmptyFile);
        }
        if !kind.matches_signature(&buffer) {
            return Err(ValidationFailure::ContentMismatch {
                declared: kind.mime(),
            });
        }

        let file_name = kind.storage_name(meta.original_name.as_deref(), Utc::now());
        Ok(ValidatedImage::new(kind, file_name, buffer.freeze()))
    }
}
