//! Feed listings and the post lifecycle routes.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

use shutter_core::domain::{FeedPage, PostId, PostView};
use shutter_core::services::{NewPost, PostChanges};
use shutter_shared::dto::{EditPostResponse, FeedResponse, PageQuery, PostResponse, image_url};

use crate::middleware::auth::CurrentUser;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

use super::form::read_post_form;
use super::see_other;

const FEED_PATH: &str = "/feed";

fn post_response(view: PostView) -> PostResponse {
    PostResponse {
        id: view.id.to_string(),
        author_id: view.author_id.to_string(),
        author_username: view.author_username,
        caption: view.caption,
        image_url: view.image_filename.as_deref().map(image_url),
        created_at: view.created_at.to_rfc3339(),
        can_edit: view.can_edit,
    }
}

fn feed_response(page: FeedPage) -> FeedResponse {
    FeedResponse {
        posts: page.posts.into_iter().map(post_response).collect(),
        current_page: page.current_page,
        total_pages: page.total_pages,
        total_posts: page.total_posts,
    }
}

/// Unparsable ids name no post.
fn parse_post_id(raw: &str) -> AppResult<PostId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("post {raw} not found")))
}

/// GET /feed?page=N
pub async fn feed(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state.feed.list(&user, query.number()).await?;
    Ok(HttpResponse::Ok().json(feed_response(page)))
}

/// GET /u/{username}?page=N
pub async fn user_feed(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .feed
        .list_by_author(&user, &path.into_inner(), query.number())
        .await?;
    Ok(HttpResponse::Ok().json(feed_response(page)))
}

/// POST /create-post
pub async fn create_post(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let form = read_post_form(&state.posts, payload).await?;

    state
        .posts
        .create(
            &user,
            NewPost {
                caption: form.caption.unwrap_or_default(),
                image: form.image,
            },
        )
        .await?;

    Ok(see_other(FEED_PATH))
}

/// GET /edit-post/{id}
pub async fn edit_post(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let post = state.posts.load_for_edit(&user, post_id).await?;

    Ok(HttpResponse::Ok().json(EditPostResponse {
        id: post.id.to_string(),
        caption: post.caption,
        image_url: post.image_filename.as_deref().map(image_url),
        created_at: post.created_at.to_rfc3339(),
        updated_at: post.updated_at.to_rfc3339(),
    }))
}

/// POST /update-post/{id}
pub async fn update_post(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let form = read_post_form(&state.posts, payload).await?;

    state
        .posts
        .update(
            &user,
            post_id,
            PostChanges {
                caption: form.caption,
                image: form.image,
            },
        )
        .await?;

    Ok(see_other(FEED_PATH))
}

/// POST /delete-post/{id}
pub async fn delete_post(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    state.posts.delete(&user, post_id).await?;

    Ok(see_other(FEED_PATH))
}
