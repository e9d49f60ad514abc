//! HTTP transport integration tests.
//!
//! Run with: `cargo test -p upkit-api-client --test http_transport_test`
//! Starts an in-process axum server on a random local port.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Multipart;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use upkit_api_client::{Auth, HttpTransport};
use upkit_core::{
    FileCandidate, FileState, MultipartPayload, UploadConfig, UploadEvent, UploadPipeline,
    UploadTransport,
};

/// Echo the received multipart fields as `content-name|filename-field|byte-count`.
async fn upload(mut multipart: Multipart) -> Result<String, StatusCode> {
    let mut file_name = String::new();
    let mut encoded_name = String::new();
    let mut byte_count = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or("unknown").to_string();
                byte_count = field
                    .bytes()
                    .await
                    .map_err(|_| StatusCode::BAD_REQUEST)?
                    .len();
            }
            "filename" => {
                encoded_name = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            _ => return Err(StatusCode::BAD_REQUEST),
        }
    }

    Ok(format!("{}|{}|{}", file_name, encoded_name, byte_count))
}

async fn authorized(headers: HeaderMap) -> Result<String, StatusCode> {
    match headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        Some("secret") => Ok("/files/ok".to_string()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn slow() -> String {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "/files/late".to_string()
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/upload", post(upload))
        .route("/authorized", post(authorized))
        .route("/slow", post(slow))
        .route("/missing", post(|| async { StatusCode::NOT_FOUND }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn payload(name: &str, content: &[u8], filename_field: Option<&str>) -> MultipartPayload {
    MultipartPayload {
        content_field: "file".to_string(),
        file_name: name.to_string(),
        content: content.to_vec().into(),
        filename_part: filename_field
            .map(|f| (f.to_string(), upkit_core::queue::encode_file_name(name))),
    }
}

#[tokio::test]
async fn test_posts_multipart_fields() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(base, Auth::None).unwrap();

    let body = transport
        .post_multipart("/upload", payload("a b.png", b"12345", Some("filename")))
        .await
        .unwrap();
    assert_eq!(body, "a b.png|a%20b.png|5");
}

#[tokio::test]
async fn test_streams_large_binary_content() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(base, Auth::None).unwrap();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();

    let body = transport
        .post_multipart("/upload", payload("scan.bin", &content, Some("filename")))
        .await
        .unwrap();
    assert_eq!(body, "scan.bin|scan.bin|300000");
}

#[tokio::test]
async fn test_omits_filename_field_when_disabled() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(base, Auth::None).unwrap();

    let body = transport
        .post_multipart("/upload", payload("a.png", b"xy", None))
        .await
        .unwrap();
    assert_eq!(body, "a.png||2");
}

#[tokio::test]
async fn test_non_success_status_maps_to_reason_phrase() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(base, Auth::None).unwrap();

    let err = transport
        .post_multipart("/missing", payload("a.png", b"x", None))
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(404));
    assert_eq!(err.status_text, "Not Found");
}

#[tokio::test]
async fn test_api_key_is_sent() {
    let base = spawn_server().await;

    let anonymous = HttpTransport::new(base.clone(), Auth::None).unwrap();
    let err = anonymous
        .post_multipart("/authorized", payload("a.png", b"x", None))
        .await
        .unwrap_err();
    assert_eq!(err.status_text, "Unauthorized");

    let keyed = HttpTransport::new(base, Auth::XApiKey("secret".to_string())).unwrap();
    let body = keyed
        .post_multipart("/authorized", payload("a.png", b"x", None))
        .await
        .unwrap();
    assert_eq!(body, "/files/ok");
}

#[tokio::test]
async fn test_timeout_reports_timeout_status_text() {
    let base = spawn_server().await;
    let transport =
        HttpTransport::with_timeout(base, Auth::None, Duration::from_millis(100)).unwrap();

    let err = transport
        .post_multipart("/slow", payload("a.png", b"x", None))
        .await
        .unwrap_err();
    assert_eq!(err.status, None);
    assert_eq!(err.status_text, "Timeout");
}

#[tokio::test]
async fn test_unreachable_server_reports_unknown_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(format!("http://{}", addr), Auth::None).unwrap();
    let err = transport
        .post_multipart("/upload", payload("a.png", b"x", None))
        .await
        .unwrap_err();
    assert_eq!(err.status, None);
    assert_eq!(err.status_text, "Unknown Error");
}

#[tokio::test]
async fn test_pipeline_uploads_through_http() {
    let base = spawn_server().await;
    let transport = Arc::new(HttpTransport::new(base, Auth::None).unwrap());
    let config = UploadConfig::default()
        .with_target_url("/upload")
        .with_file_type(".txt");
    let (pipeline, mut events) = UploadPipeline::with_transport(config, transport);

    let batch = vec![
        FileCandidate::new("notes.txt", b"hello".to_vec()),
        FileCandidate::new("image.png", b"png".to_vec()),
    ];
    let snapshot = pipeline.submit(batch).await.unwrap();
    assert_eq!(snapshot.invalid.len(), 1);

    let complete = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        if let UploadEvent::Complete(files) = event {
            break files;
        }
    };
    assert_eq!(complete.len(), 1);
    assert_eq!(complete[0].state, FileState::Success);
    assert_eq!(complete[0].url, "notes.txt|notes.txt|5");
}
