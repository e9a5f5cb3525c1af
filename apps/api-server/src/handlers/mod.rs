//! HTTP handlers and route configuration.

mod auth;
mod form;
mod health;
mod posts;
mod uploads;


use actix_web::{HttpResponse, http::header, web};

use crate::state::AppState;

/// 303 to `location`, the answer to every successful form post.
pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Configure all application routes.
///
/// Takes the state so route-level middleware can share its limiter across
/// workers.
pub fn configure_routes(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    #[cfg(feature = "rate-limit")]
    let login_limiter = crate::middleware::rate_limit::RateLimitMiddleware::new(state.login_limiter)
        .trust_forwarded(state.trust_proxy_headers);
    #[cfg(not(feature = "rate-limit"))]
    drop(state);

    move |cfg: &mut web::ServiceConfig| {
        let login = web::resource("/login").route(web::post().to(auth::login));
        #[cfg(feature = "rate-limit")]
        let login = login.wrap(login_limiter);

        cfg.route("/", web::get().to(|| async { see_other("/feed") }))
            .route("/health", web::get().to(health::health_check))
            // Auth
            .route("/signup", web::post().to(auth::signup))
            .service(login)
            .route("/logout", web::get().to(auth::logout))
            // Feed
            .route("/feed", web::get().to(posts::feed))
            .route("/u/{username}", web::get().to(posts::user_feed))
            // Posts
            .route("/create-post", web::post().to(posts::create_post))
            .route("/edit-post/{id}", web::get().to(posts::edit_post))
            .route("/update-post/{id}", web::post().to(posts::update_post))
            .route("/delete-post/{id}", web::post().to(posts::delete_post))
            // Images
            .route("/uploads/{filename}", web::get().to(uploads::serve));
    }
}
