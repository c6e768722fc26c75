//! Image processing pipeline tests, driven through the task endpoint.
//!
//! Run with: `cargo test -p proteggo-api --test pipeline_test`

mod helpers;

use helpers::fakes::DetectorScript;
use helpers::fixtures::{create_test_jpeg, face_at};
use helpers::{setup_test_app, setup_test_app_with, TestOptions, TEST_PUSH_TOKEN, TEST_SIGNING_SECRET};
use proteggo_core::constants::{IMAGE_PROCESSING_TASK_PATH, TASK_SIGNATURE_HEADER};
use proteggo_core::models::UploadTask;
use proteggo_db::DocumentStore;
use proteggo_storage::Storage;
use proteggo_worker::TaskSigner;
use serde_json::Value;

#[tokio::test]
async fn test_two_faces_produce_faces_overlay_and_notification() {
    let app = setup_test_app().await;
    app.detector
        .returns(vec![face_at(4, 4, 12), face_at(20, 10, 14)]);

    let task = app.stage_upload("img-1", create_test_jpeg(48, 36)).await;
    let response = app.run_task(&task).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "completed_notified");
    assert_eq!(body["imageId"], "img-1");

    let image = app
        .state
        .repos
        .images
        .get("img-1")
        .await
        .unwrap()
        .expect("image record");
    assert_eq!((image.width, image.height), (48, 36));
    assert!(image.storage_path.starts_with("images/") && image.storage_path.ends_with(".webp"));
    assert_eq!(body["url"], image.url.as_str());
    assert!(image.post_id.is_none());
    assert_eq!(image.faces_ids.len(), 2);
    assert_eq!(image.faces_urls.len(), 2);
    assert_eq!(
        image.faces_storage_paths,
        vec!["faces/img-1_0.jpg", "faces/img-1_1.jpg"]
    );
    assert_eq!(image.faces_overlay_storage_path, "faces_overlays/img-1.png");
    assert!(!image.faces_overlay_url.is_empty());
    assert!(app.storage.exists(&image.faces_overlay_storage_path).await.unwrap());
    assert!(app.storage.exists(&image.storage_path).await.unwrap());

    let faces = app.state.repos.faces.list_by_image("img-1").await.unwrap();
    assert_eq!(faces.len(), 2);
    for face in &faces {
        assert!(image.faces_ids.contains(&face.id));
        assert!(face.post_id.is_none());
        assert_eq!(face.emotion, "joy");
        assert_eq!(face.vertices.len(), 4);
        assert!(app.storage.exists(&face.storage_path).await.unwrap());
    }

    // Temp upload is gone once the record is persisted.
    assert!(!app.storage.exists(&task.file_path).await.unwrap());

    let payloads = app.push.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(app.push.tokens(), vec![TEST_PUSH_TOKEN.to_string()]);
    assert_eq!(payloads[0].image_id, "img-1");
    assert_eq!(payloads[0].faces_ids, image.faces_ids);
    assert_eq!(payloads[0].faces_urls, image.faces_urls);
}

#[tokio::test]
async fn test_no_faces_yields_empty_overlay_sentinel() {
    let app = setup_test_app().await;

    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let response = app.run_task(&task).await;
    assert_eq!(response.status_code(), 200);

    let image = app.state.repos.images.get("img-1").await.unwrap().unwrap();
    assert_eq!(image.faces_overlay_url, "");
    assert_eq!(image.faces_overlay_storage_path, "");
    assert!(image.faces_ids.is_empty());

    let stored = app.documents.get("images", "img-1").await.unwrap().unwrap();
    assert_eq!(stored.get("facesOverlayUrl"), Some(&Value::String(String::new())));

    let payloads = app.push.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].faces_ids.is_empty());
}

#[tokio::test]
async fn test_rerun_overwrites_same_locations() {
    let app = setup_test_app().await;
    app.detector.returns(vec![face_at(2, 2, 10)]);

    let task = app.stage_upload("img-1", create_test_jpeg(30, 30)).await;
    assert_eq!(app.run_task(&task).await.status_code(), 200);
    let first = app.state.repos.images.get("img-1").await.unwrap().unwrap();

    // At-least-once delivery: the same task arrives again.
    let task = app.stage_upload("img-1", create_test_jpeg(30, 30)).await;
    assert_eq!(app.run_task(&task).await.status_code(), 200);
    let second = app.state.repos.images.get("img-1").await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.faces_overlay_storage_path, second.faces_overlay_storage_path);
    assert_eq!(first.faces_ids, second.faces_ids);
    assert_eq!(first.faces_storage_paths, second.faces_storage_paths);
    assert_eq!(app.storage.list("faces/").await.unwrap().len(), 1);
    assert_eq!(app.state.repos.faces.list_by_image("img-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_orientation_is_corrected_before_persisting() {
    let app = setup_test_app().await;

    let staged = app.stage_upload("img-1", create_test_jpeg(40, 30)).await;
    let task = UploadTask::new("img-1", staged.file_path, 6);
    assert_eq!(app.run_task(&task).await.status_code(), 200);

    let image = app.state.repos.images.get("img-1").await.unwrap().unwrap();
    assert_eq!((image.width, image.height), (30, 40));
}

#[tokio::test]
async fn test_cleanup_failure_suppresses_notification() {
    let app = setup_test_app_with(TestOptions {
        failing_delete_prefix: Some("_temp/".to_string()),
        ..Default::default()
    })
    .await;

    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let response = app.run_task(&task).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "completed_cleanup_failed");
    assert!(app.state.repos.images.get("img-1").await.unwrap().is_some());
    assert!(app.storage.exists(&task.file_path).await.unwrap());
    assert!(app.push.payloads().is_empty());
}

#[tokio::test]
async fn test_notify_failure_is_reported_but_not_fatal() {
    let app = setup_test_app_with(TestOptions {
        without_push_token: true,
        ..Default::default()
    })
    .await;

    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let response = app.run_task(&task).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "completed_notify_failed");
    assert!(app.state.repos.images.get("img-1").await.unwrap().is_some());
    assert!(!app.storage.exists(&task.file_path).await.unwrap());
}

#[tokio::test]
async fn test_transient_detection_failure_asks_for_retry() {
    let app = setup_test_app().await;
    app.detector.script(DetectorScript::Unavailable);

    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let response = app.run_task(&task).await;

    assert_eq!(response.status_code(), 503);
    let body: Value = response.json();
    assert_eq!(body["recoverable"], true);

    // Nothing past detection ran; the raw upload is kept for the retry.
    assert!(app.state.repos.images.get("img-1").await.unwrap().is_none());
    assert!(app.storage.exists(&task.file_path).await.unwrap());
    assert!(app.push.payloads().is_empty());
}

#[tokio::test]
async fn test_permanent_failures_stop_retries() {
    let app = setup_test_app().await;
    app.detector.script(DetectorScript::Garbage);

    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let response = app.run_task(&task).await;
    assert_eq!(response.status_code(), 422);
    let body: Value = response.json();
    assert_eq!(body["recoverable"], false);

    // Missing raw upload.
    let missing = UploadTask::new("img-2", "_temp/never-uploaded.jpg", 1);
    assert_eq!(app.run_task(&missing).await.status_code(), 422);

    // Undecodable raw upload.
    app.storage
        .put("_temp/broken.jpg", vec![0xFF, 0xD8, 0xFF, 0x00, 0x01], "image/jpeg")
        .await
        .unwrap();
    let broken = UploadTask::new("img-3", "_temp/broken.jpg", 1);
    assert_eq!(app.run_task(&broken).await.status_code(), 422);
}

#[tokio::test]
async fn test_malformed_task_payload_is_permanent() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(IMAGE_PROCESSING_TASK_PATH)
        .text("{\"id\": 42")
        .await;
    assert_eq!(response.status_code(), 422);

    let response = app
        .client()
        .post(IMAGE_PROCESSING_TASK_PATH)
        .json(&serde_json::json!({ "id": "", "filePath": "_temp/a.jpg" }))
        .await;
    assert_eq!(response.status_code(), 422);
    assert_eq!(app.detector.calls(), 0);
}

#[tokio::test]
async fn test_signed_task_requests() {
    let app = setup_test_app_with(TestOptions {
        signing_secret: Some(TEST_SIGNING_SECRET.to_string()),
        ..Default::default()
    })
    .await;
    let task = app.stage_upload("img-1", create_test_jpeg(20, 20)).await;
    let body = serde_json::to_vec(&task).unwrap();

    let response = app.run_task(&task).await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .client()
        .post(IMAGE_PROCESSING_TASK_PATH)
        .add_header(TASK_SIGNATURE_HEADER, "t=1,v1=deadbeef")
        .bytes(body.clone().into())
        .await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(app.detector.calls(), 0);

    let signer = TaskSigner::new(TEST_SIGNING_SECRET).unwrap();
    let response = app
        .client()
        .post(IMAGE_PROCESSING_TASK_PATH)
        .add_header(TASK_SIGNATURE_HEADER, signer.sign(&body))
        .content_type("application/json")
        .bytes(body.into())
        .await;
    assert_eq!(response.status_code(), 200);
}
