//! Multipart post forms: an optional `caption` text field and an optional
//! `image` file field.

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};

use shutter_core::domain::{UploadMeta, ValidatedImage};
use shutter_core::error::ValidationFailure;
use shutter_core::services::PostService;

use crate::middleware::error::{AppError, AppResult};

/// Text fields larger than this are rejected outright.
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

/// A parsed create or update form.
#[derive(Debug, Default)]
pub struct PostForm {
    pub caption: Option<String>,
    pub image: Option<ValidatedImage>,
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    ValidationFailure::Malformed(e.to_string()).into()
}

/// Read a post form, validating the image as it streams in.
///
/// A file field submitted with an empty filename is the browser's way of
/// saying no file was chosen, and counts as no image.
pub async fn read_post_form(posts: &PostService, mut payload: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "caption" => form.caption = Some(read_text(&mut field).await?),
            "image" => {
                let original_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string);

                if original_name.as_deref().is_none_or(str::is_empty) {
                    drain(&mut field).await?;
                    continue;
                }

                let meta = UploadMeta {
                    content_type: field
                        .content_type()
                        .map(|mime| mime.essence_str().to_string())
                        .unwrap_or_default(),
                    original_name,
                };
                form.image = Some(posts.accept_upload(meta, &mut field).await?);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unexpected form field");
                drain(&mut field).await?;
            }
        }
    }

    Ok(form)
}

async fn read_text(field: &mut Field) -> AppResult<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed)?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(malformed("text field too long"));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(malformed)
}

async fn drain(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(malformed)?;
    }
    Ok(())
}
