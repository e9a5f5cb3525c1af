//! # Shutter Core
//!
//! The domain layer of the Shutter media feed.
//! Entities, ports and the services that coordinate them. Nothing in here
//! knows about HTTP, SQL or the filesystem.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
