//! SeaORM entities. The schema itself lives in the `migration` app.

pub mod post;
pub mod user;
