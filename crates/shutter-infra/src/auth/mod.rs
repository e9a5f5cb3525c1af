//! Authentication implementations.

mod jwt;
mod password;

pub use jwt::{JwtConfig, JwtTokenService, SigningKey};
pub use password::Argon2PasswordService;
