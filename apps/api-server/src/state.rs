//! Application state - shared across all handlers.

use std::sync::Arc;

use shutter_core::error::StorageError;
use shutter_core::ports::{
    AuthError, FileArea, PasswordService, PostRepository, TokenService, UserRepository,
};
use shutter_core::services::{
    Authenticator, FeedAssembler, OrphanSweeper, PostPolicy, PostService, UploadPolicy,
    UploadValidator,
};
use shutter_infra::database::DatabaseConfig;
use shutter_infra::{
    Argon2PasswordService, InMemoryPostRepository, InMemoryUserRepository, JwtTokenService,
    LocalFileArea,
};

#[cfg(feature = "postgres")]
use shutter_infra::database::{PostgresPostRepository, PostgresUserRepository, connect};

#[cfg(feature = "rate-limit")]
use shutter_core::ports::RateLimiter;
#[cfg(feature = "rate-limit")]
use shutter_infra::InMemoryRateLimiter;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub posts: Arc<PostService>,
    pub feed: Arc<FeedAssembler>,
    pub files: Arc<dyn FileArea>,
    pub sweeper: Arc<OrphanSweeper>,
    #[cfg(feature = "rate-limit")]
    pub login_limiter: Arc<dyn RateLimiter>,
    /// `"postgres"` or `"in-memory"`, reported by the health check.
    pub store_backend: &'static str,
    pub secure_cookies: bool,
    pub trust_proxy_headers: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Upload directory unusable: {0}")]
    Storage(#[from] StorageError),

    #[error("Authenticator setup failed: {0}")]
    Auth(#[from] AuthError),
}

/// The credential and post stores, plus which backend provides them.
struct Stores {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    backend: &'static str,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            backend: "in-memory",
        }
    }

    #[cfg(feature = "postgres")]
    async fn open(db_config: Option<&DatabaseConfig>) -> Self {
        let Some(config) = db_config else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Self::in_memory();
        };

        match connect(config).await {
            Ok(conn) => Self {
                users: Arc::new(PostgresUserRepository::new(conn.clone())),
                posts: Arc::new(PostgresPostRepository::new(conn)),
                backend: "postgres",
            },
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Self::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn open(_db_config: Option<&DatabaseConfig>) -> Self {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Self::in_memory()
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StateError> {
        let stores = Stores::open(config.database.as_ref()).await;
        let files = Arc::new(LocalFileArea::open(&config.upload_dir).await?);

        let state = Self::assemble(
            config,
            stores,
            files,
            Arc::new(Argon2PasswordService::new()),
            Arc::new(JwtTokenService::from_env()),
        )?;

        tracing::info!(store = state.store_backend, "Application state initialized");
        Ok(state)
    }

    fn assemble(
        config: &AppConfig,
        stores: Stores,
        files: Arc<dyn FileArea>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Result<Self, StateError> {
        let auth = Authenticator::new(stores.users.clone(), passwords, tokens)?;

        let validator = UploadValidator::new(UploadPolicy {
            max_bytes: config.upload_max_bytes,
            ..UploadPolicy::default()
        });
        let posts = PostService::new(
            stores.posts.clone(),
            files.clone(),
            validator,
            PostPolicy {
                require_image: config.require_image,
                caption_max_chars: config.caption_max_chars,
            },
        );
        let feed = FeedAssembler::new(stores.posts.clone(), stores.users, config.feed_page_size);
        let sweeper = OrphanSweeper::new(stores.posts, files.clone(), config.orphan_grace);

        Ok(Self {
            auth: Arc::new(auth),
            posts: Arc::new(posts),
            feed: Arc::new(feed),
            files,
            sweeper: Arc::new(sweeper),
            #[cfg(feature = "rate-limit")]
            login_limiter: Arc::new(InMemoryRateLimiter::from_env()),
            store_backend: stores.backend,
            secure_cookies: config.secure_cookies,
            trust_proxy_headers: config.trust_proxy_headers,
        })
    }

    /// In-memory state over a throwaway upload directory.
    #[cfg(test)]
    pub async fn for_tests(upload_dir: &std::path::Path) -> Self {
        use shutter_infra::{JwtConfig, SigningKey};

        let config = AppConfig {
            upload_dir: upload_dir.to_path_buf(),
            ..AppConfig::default()
        };
        let files = Arc::new(
            LocalFileArea::open(upload_dir)
                .await
                .expect("open test upload dir"),
        );
        let tokens = JwtTokenService::new(JwtConfig {
            active_key: SigningKey {
                id: "test".to_string(),
                secret: "handler-test-secret".to_string(),
            },
            ..JwtConfig::default()
        });
        let passwords =
            Argon2PasswordService::with_cost(1024, 1, 1).expect("valid argon2 test cost");

        Self::assemble(
            &config,
            Stores::in_memory(),
            files,
            Arc::new(passwords),
            Arc::new(tokens),
        )
        .expect("assemble test state")
    }
}
