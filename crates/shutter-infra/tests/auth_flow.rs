//! Registration, login and token resolution end to end.

mod common;

use std::sync::Arc;

use shutter_core::domain::UserId;
use shutter_core::error::ValidationFailure;
use shutter_core::ports::{AuthError, BaseRepository, TokenService};
use shutter_core::services::{AuthFailure, Authenticator, Registration};
use shutter_infra::{
    Argon2PasswordService, InMemoryUserRepository, JwtConfig, JwtTokenService, SigningKey,
};

struct Auth {
    users: Arc<InMemoryUserRepository>,
    tokens: Arc<JwtTokenService>,
    auth: Authenticator,
}

fn setup() -> Auth {
    let users = Arc::new(InMemoryUserRepository::new());
    let passwords = Arc::new(Argon2PasswordService::with_cost(1024, 1, 1).unwrap());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        active_key: SigningKey {
            id: "test".to_string(),
            secret: "integration-secret".to_string(),
        },
        ..JwtConfig::default()
    }));
    let auth = Authenticator::new(users.clone(), passwords, tokens.clone()).unwrap();
    Auth {
        users,
        tokens,
        auth,
    }
}

fn ada() -> Registration {
    Registration {
        username: "ada".to_string(),
        email: "Ada@Example.com".to_string(),
        password: "analytical-engine".to_string(),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let a = setup();

    let user = a.auth.register(ada()).await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_ne!(user.password_hash, "analytical-engine");

    let session = a
        .auth
        .login(" ADA@example.com", "analytical-engine")
        .await
        .unwrap();
    assert_eq!(session.user.id, user.id);
    assert_eq!(session.expires_in, 24 * 3600);

    let resolved = a.auth.authenticate(Some(&session.token)).await.unwrap();
    assert_eq!(resolved.id, user.id);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let a = setup();
    a.auth.register(ada()).await.unwrap();

    let same_email = a
        .auth
        .register(Registration {
            username: "ada2".to_string(),
            ..ada()
        })
        .await;
    assert!(matches!(same_email, Err(AuthError::Duplicate(_))));

    let same_name = a
        .auth
        .register(Registration {
            email: "other@example.com".to_string(),
            ..ada()
        })
        .await;
    assert!(matches!(same_name, Err(AuthError::Duplicate(_))));
}

#[tokio::test]
async fn test_weak_password_is_a_validation_error() {
    let a = setup();

    let result = a
        .auth
        .register(Registration {
            password: "short".to_string(),
            ..ada()
        })
        .await;

    assert!(matches!(
        result,
        Err(AuthError::Validation(ValidationFailure::InvalidField {
            field: "password",
            ..
        }))
    ));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let a = setup();
    a.auth.register(ada()).await.unwrap();

    let wrong_password = a.auth.login("ada@example.com", "difference-engine").await;
    let unknown_email = a.auth.login("nobody@example.com", "analytical-engine").await;

    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_authenticate_failures() {
    let a = setup();

    assert!(matches!(
        a.auth.authenticate(None).await,
        Err(AuthFailure::MissingToken)
    ));
    assert!(matches!(
        a.auth.authenticate(Some("")).await,
        Err(AuthFailure::MissingToken)
    ));
    assert!(matches!(
        a.auth.authenticate(Some("garbage")).await,
        Err(AuthFailure::InvalidToken(_))
    ));

    let orphan = a.tokens.generate_token(UserId::generate()).unwrap();
    assert!(matches!(
        a.auth.authenticate(Some(&orphan)).await,
        Err(AuthFailure::UnknownSubject(_))
    ));
}

#[tokio::test]
async fn test_token_of_deleted_user_stops_working() {
    let a = setup();
    let user = a.auth.register(ada()).await.unwrap();
    let session = a.auth.login("ada@example.com", "analytical-engine").await.unwrap();

    a.users.delete(user.id).await.unwrap();

    assert!(matches!(
        a.auth.authenticate(Some(&session.token)).await,
        Err(AuthFailure::UnknownSubject(id)) if id == user.id
    ));
}
