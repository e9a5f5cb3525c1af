//! Image upload types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const MAX_STORED_NAME_LEN: usize = 128;

/// The image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub const ALL: [ImageKind; 4] = [Self::Jpeg, Self::Png, Self::Gif, Self::Webp];

    /// Parse a declared content type. Parameters (`; charset=...`) are ignored.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.mime().eq_ignore_ascii_case(essence))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension_aliases().iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Canonical extension used when the client's one is unusable.
    pub fn extension(&self) -> &'static str {
        self.extension_aliases()[0]
    }

    fn extension_aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Gif => &["gif"],
            Self::Webp => &["webp"],
        }
    }

    /// Check the leading magic bytes of the content.
    pub fn matches_signature(&self, head: &[u8]) -> bool {
        match self {
            Self::Jpeg => head.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            Self::Gif => head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a"),
            Self::Webp => {
                head.starts_with(b"RIFF") && head.get(8..12) == Some(b"WEBP".as_slice())
            }
        }
    }

    /// Generate a storage name: acceptance time, a random suffix and an extension.
    ///
    /// The client's extension is kept only when it is a known alias of this
    /// kind; the rest of the client's filename is discarded.
    pub fn storage_name(&self, original_name: Option<&str>, accepted_at: DateTime<Utc>) -> String {
        let ext = original_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| self.extension_aliases().contains(&ext.as_str()))
            .unwrap_or_else(|| self.extension().to_string());

        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}.{}", accepted_at.timestamp_millis(), &suffix[..12], ext)
    }
}

/// Metadata the client declared for an upload.
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub content_type: String,
    pub original_name: Option<String>,
}

/// An upload that passed validation. Only the upload validator builds these,
/// so holding one proves type, size and signature were checked.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    kind: ImageKind,
    file_name: String,
    bytes: Bytes,
}

impl ValidatedImage {
    pub(crate) fn new(kind: ImageKind, file_name: String, bytes: Bytes) -> Self {
        Self {
            kind,
            file_name,
            bytes,
        }
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// The generated name this image will be stored under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Whether `name` is safe to use as a single path component in a file area.
pub fn is_valid_stored_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_STORED_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
