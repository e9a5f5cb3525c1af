//! Signup, login and logout.

use actix_web::{HttpResponse, http::header, web};

use shutter_core::services::Registration;
use shutter_shared::dto::{LoginRequest, SignupRequest};

use crate::middleware::auth::{LOGIN_PATH, cleared_session_cookie, session_cookie};
use crate::middleware::error::AppResult;
use crate::state::AppState;

use super::see_other;

/// POST /signup
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupRequest>,
) -> AppResult<HttpResponse> {
    let SignupRequest {
        username,
        email,
        password,
    } = form.into_inner();

    state
        .auth
        .register(Registration {
            username,
            email,
            password,
        })
        .await?;

    Ok(see_other(LOGIN_PATH))
}

/// POST /login
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let session = state.auth.login(&form.email, &form.password).await?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/feed"))
        .cookie(session_cookie(
            session.token,
            session.expires_in,
            state.secure_cookies,
        ))
        .finish())
}

/// GET /logout
pub async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, LOGIN_PATH))
        .cookie(cleared_session_cookie())
        .finish()
}
