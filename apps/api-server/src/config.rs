//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::TimeDelta;

use shutter_core::services::{DEFAULT_CAPTION_MAX_CHARS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PAGE_SIZE};
use shutter_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    /// Root of the file area (`UPLOAD_DIR`).
    pub upload_dir: PathBuf,
    pub upload_max_bytes: u64,
    pub feed_page_size: u64,
    pub caption_max_chars: usize,
    /// Reject new posts without an image (`POST_REQUIRE_IMAGE`).
    pub require_image: bool,
    /// Unreferenced files younger than this are left alone by the sweeper.
    pub orphan_grace: TimeDelta,
    pub orphan_sweep_cron: String,
    /// Mark the session cookie `Secure` (`COOKIE_SECURE`).
    pub secure_cookies: bool,
    /// Take the client address from `Forwarded` / `X-Forwarded-For`
    /// (`TRUST_PROXY_HEADERS`). Only safe behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: None,
            upload_dir: PathBuf::from("uploads"),
            upload_max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            feed_page_size: DEFAULT_PAGE_SIZE,
            caption_max_chars: DEFAULT_CAPTION_MAX_CHARS,
            require_image: true,
            orphan_grace: TimeDelta::hours(1),
            orphan_sweep_cron: "0 */15 * * * *".to_string(),
            secure_cookies: false,
            trust_proxy_headers: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            database: DatabaseConfig::from_env(),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            upload_max_bytes: parsed("UPLOAD_MAX_BYTES", defaults.upload_max_bytes),
            feed_page_size: parsed("FEED_PAGE_SIZE", defaults.feed_page_size),
            caption_max_chars: parsed("CAPTION_MAX_CHARS", defaults.caption_max_chars),
            require_image: flag("POST_REQUIRE_IMAGE", defaults.require_image),
            orphan_grace: seconds("ORPHAN_GRACE_SECS", defaults.orphan_grace),
            orphan_sweep_cron: env::var("ORPHAN_SWEEP_CRON").unwrap_or(defaults.orphan_sweep_cron),
            secure_cookies: flag("COOKIE_SECURE", defaults.secure_cookies),
            trust_proxy_headers: flag("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers),
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

fn seconds(key: &str, default: TimeDelta) -> TimeDelta {
    match env::var(key) {
        Ok(raw) => parse_seconds(&raw).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Ignoring out-of-range duration");
            default
        }),
        Err(_) => default,
    }
}

fn parse_seconds(raw: &str) -> Option<TimeDelta> {
    raw.trim().parse().ok().and_then(TimeDelta::try_seconds)
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("3600"), Some(TimeDelta::hours(1)));
        assert_eq!(parse_seconds(" 90 "), Some(TimeDelta::seconds(90)));
        assert_eq!(parse_seconds("soon"), None);
        assert_eq!(parse_seconds(&i64::MAX.to_string()), None);
    }
}
