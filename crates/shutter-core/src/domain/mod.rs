//! Domain entities - the core business objects.

mod feed;
mod id;
mod post;
mod upload;
mod user;

pub use feed::{FeedPage, PostView};
pub use id::{PostId, UserId};
pub use post::Post;
pub use upload::{ImageKind, UploadMeta, ValidatedImage, is_valid_stored_name};
pub use user::User;
