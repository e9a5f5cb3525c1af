//! Session cookie handling and the authenticated-user extractor.

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use futures::future::LocalBoxFuture;

use shutter_core::domain::User;
use shutter_core::services::AuthFailure;
use shutter_shared::ErrorResponse;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";
pub const LOGIN_PATH: &str = "/login";

/// Build the session cookie for a freshly issued token.
pub fn session_cookie(token: String, lifetime_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(lifetime_secs))
        .finish()
}

/// A cookie that makes the browser drop the session.
pub fn cleared_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// The token presented with a request: the session cookie, or a Bearer header.
fn presented_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// The authenticated user acting on a request.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(CurrentUser(user): CurrentUser) -> impl Responder {
///     format!("Hello, {}!", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Rejection for requests that could not be tied to a user.
#[derive(Debug)]
pub struct AuthenticationError(pub AuthFailure);

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AuthFailure::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SEE_OTHER,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            AuthFailure::Unavailable(reason) => {
                tracing::error!(reason = %reason, "Cannot authenticate: credential store unavailable");
                HttpResponse::InternalServerError().json(ErrorResponse::internal_error())
            }
            failure => {
                tracing::info!(kind = failure.kind(), "Unauthenticated request, redirecting to login");
                HttpResponse::SeeOther()
                    .insert_header((header::LOCATION, LOGIN_PATH))
                    .cookie(cleared_session_cookie())
                    .finish()
            }
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = AuthenticationError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = presented_token(req);

        Box::pin(async move {
            let Some(state) = state else {
                tracing::error!("AppState not found in app data");
                return Err(AuthenticationError(AuthFailure::Unavailable(
                    "server configuration error".to_string(),
                )));
            };

            state
                .auth
                .authenticate(token.as_deref())
                .await
                .map(CurrentUser)
                .map_err(AuthenticationError)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn test_cookie_wins_over_bearer() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(presented_token(&req).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_header_is_accepted() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();

        assert_eq!(presented_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert_eq!(presented_token(&req), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("t".to_string(), 86400, false);

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(86400)));
    }

    #[test]
    fn test_redirect_clears_cookie() {
        let response = AuthenticationError(AuthFailure::MissingToken).error_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_PATH
        );
        let cleared = response.cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(cleared.max_age(), Some(Duration::ZERO));
    }
}
