//! Services - the use cases, composed from ports.

mod auth;
mod feed;
mod posts;
mod sweep;
mod upload;

pub use auth::{AuthFailure, Authenticator, Registration, Session};
pub use feed::{DEFAULT_PAGE_SIZE, DELETED_AUTHOR, FeedAssembler};
pub use posts::{DEFAULT_CAPTION_MAX_CHARS, NewPost, PostChanges, PostPolicy, PostService};
pub use sweep::{OrphanSweeper, SweepReport};
pub use upload::{DEFAULT_MAX_UPLOAD_BYTES, UploadPolicy, UploadValidator};
