//! File areas for uploaded images.

mod local;

pub use local::LocalFileArea;
