//! Posts and messaging token tests.
//!
//! Run with: `cargo test -p proteggo-api --test posts_test`

mod helpers;

use helpers::fixtures::{create_test_jpeg, face_at};
use helpers::setup_test_app;
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_post_links_images_and_faces() {
    let app = setup_test_app().await;
    app.detector.returns(vec![face_at(1, 1, 8), face_at(12, 1, 8)]);
    let task = app.stage_upload("img-1", create_test_jpeg(32, 16)).await;
    assert_eq!(app.run_task(&task).await.status_code(), 200);
    let image = app.state.repos.images.get("img-1").await.unwrap().unwrap();

    let response = app
        .client()
        .post("/api/posts")
        .json(&json!({
            "id": "post-1",
            "body": "beach day #summer",
            "hashTagsValues": ["summer"],
            "hashTagsIds": ["tag-1"],
            "imagesIds": ["img-1"],
            "imagesUrls": [image.url],
            "imagesStoragePaths": [image.storage_path],
            "facesIds": { "img-1": [image.faces_ids[0]] },
            "facesUrls": { "img-1": [image.faces_urls[0]] },
            "facesStoragePaths": { "img-1": [image.faces_storage_paths[0]] },
        }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");

    let post = app.state.repos.posts.get("post-1").await.unwrap().unwrap();
    assert_eq!(post.body, "beach day #summer");
    assert_eq!(post.images_ids, vec!["img-1"]);
    assert!(post.obscured_overlays_ids.is_empty());

    let image = app.state.repos.images.get("img-1").await.unwrap().unwrap();
    assert_eq!(image.post_id.as_deref(), Some("post-1"));
    // Merge update leaves the rest of the record alone.
    assert_eq!(image.faces_ids.len(), 2);

    let linked = app.state.repos.faces.get(&image.faces_ids[0]).await.unwrap().unwrap();
    assert_eq!(linked.post_id.as_deref(), Some("post-1"));
    let unlinked = app.state.repos.faces.get(&image.faces_ids[1]).await.unwrap().unwrap();
    assert!(unlinked.post_id.is_none());

    // A linked image is no longer unused.
    let response = app.client().delete("/api/images/unused").await;
    assert_eq!(response.json::<Value>()["deletedIds"], json!([]));
}

#[tokio::test]
async fn test_create_post_skips_unknown_images() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/posts")
        .json(&json!({ "id": "post-1", "imagesIds": ["ghost"] }))
        .await;

    assert_eq!(response.status_code(), 200);
    assert!(app.state.repos.posts.get("post-1").await.unwrap().is_some());
    assert!(app.state.repos.images.get("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_post_rejects_invalid_body() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/posts")
        .json(&json!({ "body": "missing id" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .post("/api/posts")
        .json(&json!({ "id": "post-1", "imagesIds": "img-1" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_register_messaging_token_replaces_previous() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/messaging")
        .json(&json!({ "clientId": "phone-2", "token": "device-token-2" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let stored = app.state.repos.tokens.get().await.unwrap().unwrap();
    assert_eq!(stored.client_id, "phone-2");
    assert_eq!(stored.token, "device-token-2");

    let task = app.stage_upload("img-1", create_test_jpeg(16, 16)).await;
    assert_eq!(app.run_task(&task).await.status_code(), 200);
    assert_eq!(app.push.tokens(), vec!["device-token-2".to_string()]);
}

#[tokio::test]
async fn test_register_empty_token_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/messaging")
        .json(&json!({ "clientId": "phone", "token": "  " }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = app
        .client()
        .post("/api/messaging")
        .json(&json!({ "clientId": "phone" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["status"], "alive");
}
