use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use shutter_core::domain::{Post, PostId, UserId};
use shutter_core::error::RepoError;
use shutter_core::ports::{BaseRepository, PostRepository};

use crate::database::entity::post;
use crate::database::postgres_repo::PostgresPostRepository;

fn post_model(caption: &str, image: Option<&str>) -> post::Model {
    let now = Utc::now();
    post::Model {
        id: Uuid::now_v7(),
        author_id: Uuid::new_v4(),
        caption: caption.to_owned(),
        image_filename: image.map(str::to_owned),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let model = post_model("Sunset", Some("1700000000000-abc.jpg"));
    let post_id = PostId::from_uuid(model.id);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let post: Post = repo.find_by_id(post_id).await.unwrap().unwrap();

    assert_eq!(post.id, post_id);
    assert_eq!(post.caption, "Sunset");
    assert_eq!(post.image_filename.as_deref(), Some("1700000000000-abc.jpg"));
}

#[tokio::test]
async fn test_list_page_maps_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![
            post_model("second", Some("b.png")),
            post_model("first", None),
        ]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let page = repo.list_page(0, 4).await.unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].caption, "second");
    assert_eq!(page[1].image_filename, None);
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result = BaseRepository::<Post, PostId>::delete(&repo, PostId::generate()).await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_update_of_vanished_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post = Post::new(UserId::generate(), "gone".to_string(), None);

    let result = BaseRepository::<Post, PostId>::update(&repo, post).await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_insert_returns_stored_row() {
    let model = post_model("hello", Some("c.gif"));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![model.clone()]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let post: Post = model.clone().into();

    let saved = BaseRepository::<Post, PostId>::insert(&repo, post).await.unwrap();

    assert_eq!(saved.id.as_uuid(), model.id);
    assert_eq!(saved.image_filename.as_deref(), Some("c.gif"));
}
