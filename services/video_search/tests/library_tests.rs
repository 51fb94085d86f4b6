mod common;

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use common::serve;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use video_search_core::domain::{IndexingStatus, UploadedVideo, VideoId};
use video_search_lib::adapters::{MemoryCredentialStore, RestGatewayAdapter};
use video_search_lib::VideoLibrary;

fn video(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "indexing_status": "COMPLETED",
        "created_at": "2024-01-01T00:00:00",
        "minio_path": format!("/v/{}", id)
    })
}

/// A backend with videos 1 and 2 where only id 1 can be deleted and listing
/// fails once `broken` is set.
fn backend(broken: Arc<AtomicBool>) -> Router {
    Router::new()
        .route(
            "/api/videos",
            get(move || {
                let broken = broken.clone();
                async move {
                    if broken.load(Ordering::SeqCst) {
                        Err((StatusCode::INTERNAL_SERVER_ERROR, "database unavailable"))
                    } else {
                        Ok(Json(json!([video(1, "Intro"), video(2, "Lecture")])))
                    }
                }
            }),
        )
        .route(
            "/api/videos/{id}",
            delete(|Path(id): Path<String>| async move {
                if id == "1" {
                    (StatusCode::OK, r#"{"message":"Video deleted successfully"}"#)
                } else {
                    (StatusCode::NOT_FOUND, r#"{"detail":"Video not found"}"#)
                }
            }),
        )
}

async fn gateway(broken: Arc<AtomicBool>) -> RestGatewayAdapter {
    let base_url = serve(backend(broken)).await;
    RestGatewayAdapter::new(
        &base_url,
        Duration::from_secs(5),
        Arc::new(MemoryCredentialStore::with_token("tok")),
    )
    .unwrap()
}

#[tokio::test]
async fn failed_refresh_keeps_list_and_records_error() {
    let broken = Arc::new(AtomicBool::new(false));
    let gateway = gateway(broken.clone()).await;
    let mut library = VideoLibrary::new();

    library.refresh(&gateway).await.unwrap();
    assert_eq!(library.videos().len(), 2);
    assert!(library.load_error().is_none());

    broken.store(true, Ordering::SeqCst);
    let err = library.refresh(&gateway).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(library.videos().len(), 2);
    let message = library.load_error().unwrap();
    assert!(message.starts_with("Failed to load videos"));
    assert!(message.contains("database unavailable"));

    // Retrying after recovery clears the error.
    broken.store(false, Ordering::SeqCst);
    library.refresh(&gateway).await.unwrap();
    assert!(library.load_error().is_none());
}

#[tokio::test]
async fn delete_removes_entry_only_after_server_success() {
    let gateway = gateway(Arc::new(AtomicBool::new(false))).await;
    let mut library = VideoLibrary::new();
    library.refresh(&gateway).await.unwrap();

    let missing = library.delete(&gateway, &VideoId::from("2")).await.unwrap_err();
    assert!(missing.is_not_found());
    assert_eq!(library.videos().len(), 2);
    assert!(library.find(&VideoId::from("2")).is_some());

    library.delete(&gateway, &VideoId::from("1")).await.unwrap();
    assert_eq!(library.videos().len(), 1);
    assert!(library.find(&VideoId::from("1")).is_none());
}

#[tokio::test]
async fn accepted_upload_is_listed_first_as_pending() {
    let gateway = gateway(Arc::new(AtomicBool::new(false))).await;
    let mut library = VideoLibrary::new();
    library.refresh(&gateway).await.unwrap();

    let uploaded = UploadedVideo { video_id: VideoId::from("42"), message: None };
    let entry = library.record_upload(&uploaded, "Test").clone();

    assert_eq!(entry.id, VideoId::from("42"));
    assert_eq!(entry.title, "Test");
    assert_eq!(entry.indexing_status, IndexingStatus::Pending);
    assert_eq!(entry.storage_path, "/videos/42");
    assert!(chrono::DateTime::parse_from_rfc3339(&entry.created_at).is_ok());

    assert_eq!(library.videos().len(), 3);
    assert_eq!(library.videos()[0].id, VideoId::from("42"));

    // Recording the same id again replaces rather than duplicates.
    library.record_upload(&uploaded, "Test again");
    assert_eq!(library.videos().len(), 3);
    assert_eq!(library.videos()[0].title, "Test again");
}
