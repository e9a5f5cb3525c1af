//! JWT session tokens with signing-key rotation.

use std::collections::HashMap;

use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use serde::{Deserialize, Serialize};

use shutter_core::domain::UserId;
use shutter_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";
const DEFAULT_EXPIRATION_HOURS: i64 = 24;
/// Ten years.
const MAX_EXPIRATION_HOURS: i64 = 24 * 365 * 10;

/// A named HMAC secret. The id travels in the token's `kid` header.
#[derive(Debug, Clone)]
pub struct SigningKey {
    pub id: String,
    pub secret: String,
}

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signs new tokens.
    pub active_key: SigningKey,
    /// Still accepted for verification until their tokens expire.
    pub retired_keys: Vec<SigningKey>,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            active_key: SigningKey {
                id: "primary".to_string(),
                secret: DEFAULT_SECRET.to_string(),
            },
            retired_keys: Vec::new(),
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
            issuer: "shutter".to_string(),
        }
    }
}

impl JwtConfig {
    /// Load from `JWT_SECRET`, `JWT_KEY_ID`, `JWT_RETIRED_KEYS`
    /// (`id:secret,id:secret`), `JWT_EXPIRATION_HOURS` and `JWT_ISSUER`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());
        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        Self {
            active_key: SigningKey {
                id: std::env::var("JWT_KEY_ID").unwrap_or(defaults.active_key.id),
                secret,
            },
            retired_keys: std::env::var("JWT_RETIRED_KEYS")
                .map(|raw| parse_retired_keys(&raw))
                .unwrap_or_default(),
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.expiration_hours),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
        }
    }
}

fn parse_retired_keys(raw: &str) -> Vec<SigningKey> {
    raw.split(',')
        .filter_map(|entry| {
            let (id, secret) = entry.trim().split_once(':')?;
            if id.is_empty() || secret.is_empty() {
                tracing::warn!("Ignoring malformed entry in JWT_RETIRED_KEYS");
                return None;
            }
            Some(SigningKey {
                id: id.to_string(),
                secret: secret.to_string(),
            })
        })
        .collect()
}

/// Token lifetime for `hours`, or the default when it is out of range.
fn token_lifetime(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours)
        .filter(|_| hours.abs() <= MAX_EXPIRATION_HOURS)
        .unwrap_or_else(|| {
            tracing::warn!(
                hours,
                default = DEFAULT_EXPIRATION_HOURS,
                "Token lifetime out of range, using default"
            );
            TimeDelta::hours(DEFAULT_EXPIRATION_HOURS)
        })
}

/// Internal JWT claims structure for serialization.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: i64,
    iat: i64,
    iss: String,
}

/// HS256 token service.
pub struct JwtTokenService {
    active_kid: String,
    encoding_key: EncodingKey,
    decoding_keys: HashMap<String, DecodingKey>,
    lifetime: TimeDelta,
    issuer: String,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.active_key.secret.as_bytes());
        let decoding_keys = std::iter::once(&config.active_key)
            .chain(config.retired_keys.iter())
            .map(|key| (key.id.clone(), DecodingKey::from_secret(key.secret.as_bytes())))
            .collect();

        Self {
            active_kid: config.active_key.id,
            encoding_key,
            decoding_keys,
            lifetime: token_lifetime(config.expiration_hours),
            issuer: config.issuer,
        }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }
}

impl TokenService for JwtTokenService {
    fn generate_token(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + self.lifetime;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };
        let header = Header {
            kid: Some(self.active_kid.clone()),
            ..Header::new(Algorithm::HS256)
        };

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;
        let key = self
            .decoding_keys
            .get(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id {kid}")))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let user_id = token_data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            issued_at: token_data.claims.iat,
            exp: token_data.claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        self.lifetime.num_seconds()
    }
}
