//! Create, edit and delete against a real upload directory.

mod common;

use std::sync::atomic::Ordering;

use bytes::Bytes;
use futures::stream;

use common::{Harness, jpeg, png};
use shutter_core::DomainError;
use shutter_core::domain::{PostId, UploadMeta};
use shutter_core::error::{PersistenceFailure, ValidationFailure};
use shutter_core::ports::FileArea;
use shutter_core::services::{NewPost, PostChanges, PostPolicy};

#[tokio::test]
async fn test_create_stores_file_before_record() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;
    let image = png().await;
    let expected_name = image.file_name().to_string();

    let id = h
        .service
        .create(
            &alice,
            NewPost {
                caption: "  first light  ".to_string(),
                image: Some(image),
            },
        )
        .await
        .unwrap();

    let post = h.post(id).await.unwrap();
    assert_eq!(post.author_id, alice.id);
    assert_eq!(post.caption, "first light");
    assert_eq!(post.image_filename.as_deref(), Some(expected_name.as_str()));
    assert!(h.files.exists(&expected_name).await.unwrap());
}

#[tokio::test]
async fn test_create_without_image_is_rejected_by_default() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;

    let result = h
        .service
        .create(
            &alice,
            NewPost {
                caption: "words only".to_string(),
                image: None,
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DomainError::Validation(ValidationFailure::MissingImage))
    ));
    assert_eq!(h.posts.inner_count().await, 0);
}

#[tokio::test]
async fn test_create_without_image_when_allowed() {
    let h = Harness::with_policy(PostPolicy {
        require_image: false,
        ..PostPolicy::default()
    })
    .await;
    let alice = h.register("alice").await;

    let id = h
        .service
        .create(
            &alice,
            NewPost {
                caption: "words only".to_string(),
                image: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(h.post(id).await.unwrap().image_filename, None);
}

#[tokio::test]
async fn test_overlong_caption_writes_no_file() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;

    let result = h
        .service
        .create(
            &alice,
            NewPost {
                caption: "x".repeat(2201),
                image: Some(png().await),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DomainError::Validation(ValidationFailure::CaptionTooLong { max: 2200 }))
    ));
    assert!(h.stored_names().await.is_empty());
}

#[tokio::test]
async fn test_rejected_upload_leaves_no_file() {
    let h = Harness::new().await;
    let meta = UploadMeta {
        content_type: "text/plain".to_string(),
        original_name: Some("notes.txt".to_string()),
    };
    let body = stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(b"hello"))]);

    let result = h.service.accept_upload(meta, body).await;

    assert!(matches!(
        result,
        Err(DomainError::Validation(ValidationFailure::UnsupportedType(_)))
    ));
    assert!(h.stored_names().await.is_empty());
}

#[tokio::test]
async fn test_failed_insert_discards_written_file() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;
    h.posts.fail_writes();

    let result = h
        .service
        .create(
            &alice,
            NewPost {
                caption: String::new(),
                image: Some(png().await),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DomainError::Persistence(PersistenceFailure::Store(_)))
    ));
    assert!(h.stored_names().await.is_empty());
}

#[tokio::test]
async fn test_lost_write_is_not_persisted() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;
    h.files.lose_writes.store(true, Ordering::SeqCst);

    let result = h
        .service
        .create(
            &alice,
            NewPost {
                caption: String::new(),
                image: Some(png().await),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(DomainError::Persistence(PersistenceFailure::NotPersisted(_)))
    ));
    assert_eq!(h.posts.inner_count().await, 0);
}

async fn seeded(h: &Harness, owner: &str) -> (shutter_core::domain::User, PostId, String) {
    let user = h.register(owner).await;
    let image = png().await;
    let name = image.file_name().to_string();
    let id = h
        .service
        .create(
            &user,
            NewPost {
                caption: "original".to_string(),
                image: Some(image),
            },
        )
        .await
        .unwrap();
    (user, id, name)
}

#[tokio::test]
async fn test_update_by_stranger_is_forbidden_and_changes_nothing() {
    let h = Harness::new().await;
    let (_, id, original) = seeded(&h, "alice").await;
    let mallory = h.register("mallory").await;
    let before = h.post(id).await.unwrap();

    let result = h
        .service
        .update(
            &mallory,
            id,
            PostChanges {
                caption: Some("pwned".to_string()),
                image: Some(jpeg().await),
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::Forbidden { .. })));
    assert_eq!(h.post(id).await.unwrap(), before);
    assert_eq!(h.stored_names().await, vec![original]);
}

#[tokio::test]
async fn test_update_replaces_image_and_removes_old_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;
    let replacement = jpeg().await;
    let new_name = replacement.file_name().to_string();

    let updated = h
        .service
        .update(
            &alice,
            id,
            PostChanges {
                caption: None,
                image: Some(replacement),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.image_filename.as_deref(), Some(new_name.as_str()));
    assert_eq!(updated.caption, "original");
    assert!(updated.updated_at >= updated.created_at);
    assert!(h.files.exists(&new_name).await.unwrap());
    assert!(!h.files.exists(&original).await.unwrap());
}

#[tokio::test]
async fn test_caption_only_update_keeps_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;

    let updated = h
        .service
        .update(
            &alice,
            id,
            PostChanges {
                caption: Some("edited".to_string()),
                image: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.caption, "edited");
    assert_eq!(updated.image_filename.as_deref(), Some(original.as_str()));
    assert_eq!(h.stored_names().await, vec![original]);
}

#[tokio::test]
async fn test_blank_update_is_a_no_op() {
    let h = Harness::new().await;
    let (alice, id, _) = seeded(&h, "alice").await;
    let before = h.post(id).await.unwrap();

    let after = h
        .service
        .update(
            &alice,
            id,
            PostChanges {
                caption: Some("   ".to_string()),
                image: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(after, before);
    assert_eq!(h.post(id).await.unwrap(), before);
}

#[tokio::test]
async fn test_failed_update_keeps_old_image_and_drops_new() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;
    let before = h.post(id).await.unwrap();
    h.posts.fail_writes();

    let result = h
        .service
        .update(
            &alice,
            id,
            PostChanges {
                caption: None,
                image: Some(jpeg().await),
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::Persistence(_))));
    assert_eq!(h.post(id).await.unwrap(), before);
    assert_eq!(h.stored_names().await, vec![original]);
}

#[tokio::test]
async fn test_update_missing_post_is_not_found() {
    let h = Harness::new().await;
    let alice = h.register("alice").await;

    let result = h
        .service
        .update(&alice, PostId::generate(), PostChanges::default())
        .await;

    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_load_for_edit_checks_ownership() {
    let h = Harness::new().await;
    let (alice, id, _) = seeded(&h, "alice").await;
    let bob = h.register("bob").await;

    assert_eq!(h.service.load_for_edit(&alice, id).await.unwrap().id, id);
    assert!(matches!(
        h.service.load_for_edit(&bob, id).await,
        Err(DomainError::Forbidden { .. })
    ));
}

#[tokio::test]
async fn test_delete_removes_record_and_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;

    h.service.delete(&alice, id).await.unwrap();

    assert!(h.post(id).await.is_none());
    assert!(!h.files.exists(&original).await.unwrap());

    assert!(matches!(
        h.service.delete(&alice, id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_by_stranger_is_forbidden() {
    let h = Harness::new().await;
    let (_, id, original) = seeded(&h, "alice").await;
    let mallory = h.register("mallory").await;

    let result = h.service.delete(&mallory, id).await;

    assert!(matches!(result, Err(DomainError::Forbidden { .. })));
    assert!(h.post(id).await.is_some());
    assert!(h.files.exists(&original).await.unwrap());
}

#[tokio::test]
async fn test_delete_tolerates_already_missing_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;
    h.files.inner.remove(&original).await.unwrap();

    h.service.delete(&alice, id).await.unwrap();

    assert!(h.post(id).await.is_none());
}

#[tokio::test]
async fn test_delete_with_stuck_file_keeps_post_and_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;
    let before = h.post(id).await.unwrap();
    h.files.fail_removes.store(true, Ordering::SeqCst);

    let result = h.service.delete(&alice, id).await;

    assert!(matches!(
        result,
        Err(DomainError::Persistence(PersistenceFailure::Files(_)))
    ));
    assert_eq!(h.post(id).await, Some(before));
    assert_eq!(h.stored_names().await, vec![original.clone()]);

    // Once removal works again the same delete goes through.
    h.files.fail_removes.store(false, Ordering::SeqCst);
    h.service.delete(&alice, id).await.unwrap();
    assert!(h.post(id).await.is_none());
    assert!(h.stored_names().await.is_empty());
}

#[tokio::test]
async fn test_update_survives_stuck_old_file() {
    let h = Harness::new().await;
    let (alice, id, original) = seeded(&h, "alice").await;
    h.files.fail_removes.store(true, Ordering::SeqCst);
    let replacement = jpeg().await;
    let new_name = replacement.file_name().to_string();

    let updated = h
        .service
        .update(
            &alice,
            id,
            PostChanges {
                caption: None,
                image: Some(replacement),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.image_filename.as_deref(), Some(new_name.as_str()));
    let stored = h.post(id).await.unwrap();
    assert_eq!(stored.image_filename.as_deref(), Some(new_name.as_str()));
    assert!(h.files.exists(&new_name).await.unwrap());
    // The old image is orphaned, not lost from under the record.
    assert!(h.files.exists(&original).await.unwrap());
}
