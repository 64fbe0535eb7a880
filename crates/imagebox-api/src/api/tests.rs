//! Integration tests for the image API.
//!
//! Tests use `tower::ServiceExt::oneshot()` to drive the axum router in-process
//! against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::db::{ImageRecord, MetadataStore};
use crate::storage::{ObjectStore, PutObject, StorageError};
use crate::testing::{memory_state, TEST_BUCKET};

use super::{create_router, AppState};

const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";
const MAX_BODY: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Test harness
// ---------------------------------------------------------------------------

fn make_app() -> Router {
    let (state, _, _) = memory_state();
    create_router(state, MAX_BODY)
}

/// Send one request through the router and return the response parts.
async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, bytes::Bytes) {
    let resp: Response = app.oneshot(req).await.expect("router returned error");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, headers, body)
}

fn json_body(body: &bytes::Bytes) -> Value {
    serde_json::from_slice(body).expect("response is not valid JSON")
}

fn multipart_body(filename: &str, content_type: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\nholiday\r\n");
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_req(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_req(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn record(id: &str, uploaded_at: &str) -> ImageRecord {
    ImageRecord {
        image_id: id.into(),
        filename: format!("{}.png", id),
        content_type: "image/png".into(),
        s3_key: format!("images/{}.png", id),
        size: 3,
        uploaded_at: uploaded_at.into(),
        bucket: TEST_BUCKET.into(),
    }
}

/// Object store whose presigning always fails.
struct NoLinkStore;

#[async_trait]
impl ObjectStore for NoLinkStore {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn put_object(&self, _object: PutObject) -> Result<(), StorageError> {
        Ok(())
    }

    fn presign_get(&self, _key: &str, _expires_in: Duration) -> Result<String, StorageError> {
        Err(StorageError::Presign("no credentials".into()))
    }
}

/// Object store that rejects every upload.
struct RejectingStore;

#[async_trait]
impl ObjectStore for RejectingStore {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn put_object(&self, _object: PutObject) -> Result<(), StorageError> {
        Err(StorageError::Status {
            status: 403,
            body: "AccessDenied".into(),
        })
    }

    fn presign_get(&self, key: &str, _expires_in: Duration) -> Result<String, StorageError> {
        Ok(format!("https://example.invalid/{}", key))
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multipart_upload_stores_exact_bytes() {
    let (state, objects, metadata) = memory_state();
    let app = create_router(state, MAX_BODY);
    let payload: Vec<u8> = (0u8..=255).chain([b'\r', b'\n', b'-', b'-']).collect();

    let (status, headers, body) = send(
        app,
        multipart_req("/upload", multipart_body("cat.png", Some("image/png"), &payload)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["access-control-allow-origin"], "*");
    let json = json_body(&body);
    assert_eq!(json["message"], "Image uploaded successfully");
    assert_eq!(json["filename"], "cat.png");
    assert_eq!(json["contentType"], "image/png");
    assert_eq!(json["size"], payload.len());
    assert_eq!(json["bucket"], TEST_BUCKET);

    let id = json["imageId"].as_str().unwrap();
    let key = format!("images/{}.png", id);
    assert_eq!(json["s3Key"], key.as_str());
    assert!(json["downloadUrl"]
        .as_str()
        .unwrap()
        .contains("X-Amz-Signature="));

    let stored = objects.get(&key).expect("object stored");
    assert_eq!(stored.body, payload);
    assert_eq!(stored.metadata["original-filename"], "cat.png");
    assert_eq!(stored.metadata["image-id"], id);
    assert_eq!(metadata.len(), 1);
}

#[tokio::test]
async fn multipart_upload_defaults_content_type() {
    let app = make_app();
    let (status, _, body) = send(
        app,
        multipart_req(
            "/images",
            multipart_body("blob", None, b"hello world!"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let json = json_body(&body);
    assert_eq!(json["size"], 12);
    assert_eq!(json["contentType"], "application/octet-stream");
    assert!(json["s3Key"].as_str().unwrap().ends_with(".jpg"));
}

#[tokio::test]
async fn multipart_without_boundary_is_rejected() {
    let app = make_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header("content-type", "multipart/form-data")
        .body(Body::from("irrelevant"))
        .unwrap();

    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({"error": "No boundary found in Content-Type header"})
    );
}

#[tokio::test]
async fn multipart_without_file_is_rejected() {
    let (state, objects, _) = memory_state();
    let app = create_router(state, MAX_BODY);
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nhi\r\n--{b}--\r\n",
        b = BOUNDARY
    );

    let (status, _, body) = send(app, multipart_req("/upload", body.into_bytes())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"], "No file found in request");
    assert!(objects.is_empty());
}

#[tokio::test]
async fn other_content_types_are_rejected() {
    let app = make_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();

    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body)["error"],
        "Content-Type must be multipart/form-data"
    );
}

#[tokio::test]
async fn json_upload_stores_decoded_content() {
    let (state, objects, _) = memory_state();
    let app = create_router(state, MAX_BODY);

    let (status, _, body) = send(
        app,
        json_req(
            "/upload",
            json!({
                "filename": "note.gif",
                "content": "aGVsbG8gd29ybGQh",
                "contentType": "image/gif"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let json = json_body(&body);
    assert_eq!(json["size"], 12);
    let stored = objects.get(json["s3Key"].as_str().unwrap()).unwrap();
    assert_eq!(stored.body, b"hello world!");
    assert_eq!(stored.content_type, "image/gif");
}

#[tokio::test]
async fn json_upload_missing_field_is_rejected() {
    let app = make_app();
    let (status, _, body) = send(
        app,
        json_req("/upload", json!({"filename": "a.png", "content": "AA=="})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body),
        json!({"error": "Missing required fields: filename, content, contentType"})
    );
}

#[tokio::test]
async fn storage_failure_returns_500() {
    let (_, _, metadata) = memory_state();
    let state = AppState {
        objects: Arc::new(RejectingStore),
        metadata: metadata.clone(),
        url_expiry: Duration::from_secs(60),
    };
    let app = create_router(state, MAX_BODY);

    let (status, headers, body) = send(
        app,
        multipart_req("/upload", multipart_body("a.png", None, b"abc")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers["access-control-allow-origin"], "*");
    let json = json_body(&body);
    assert_eq!(json["error"], "Internal server error");
    assert!(json["message"].as_str().unwrap().contains("403"));
    assert!(metadata.is_empty());
}

#[tokio::test]
async fn body_over_limit_is_rejected() {
    let (state, objects, _) = memory_state();
    let app = create_router(state, 64);

    let (status, headers, body) = send(
        app,
        multipart_req("/upload", multipart_body("a.png", None, &[7u8; 256])),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(json_body(&body)["error"], "Request body too large");
    assert!(objects.is_empty());
}

// ---------------------------------------------------------------------------
// Listing and lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_respects_limit_and_links_every_item() {
    let (state, _, metadata) = memory_state();
    for i in 0..5 {
        metadata
            .put_item(&record(
                &format!("img-{}", i),
                &format!("2024-01-0{}T00:00:00.000000", i + 1),
            ))
            .await
            .unwrap();
    }
    let app = create_router(state, MAX_BODY);

    let (status, headers, body) = send(app, get_req("/images?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");

    let json = json_body(&body);
    assert_eq!(json["count"], 2);
    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["imageId"], "img-4");
    assert_eq!(images[1]["imageId"], "img-3");
    for image in images {
        assert!(image["downloadUrl"].is_string());
    }
}

#[tokio::test]
async fn list_defaults_to_all_when_few_records() {
    let (state, _, metadata) = memory_state();
    metadata
        .put_item(&record("only", "2024-01-01T00:00:00.000000"))
        .await
        .unwrap();
    let app = create_router(state, MAX_BODY);

    let (status, _, body) = send(app, get_req("/images")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["count"], 1);
}

#[tokio::test]
async fn list_rejects_invalid_limit() {
    for uri in ["/images?limit=abc", "/images?limit=0"] {
        let (status, _, body) = send(make_app(), get_req(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json_body(&body), json!({"error": "Invalid limit"}));
    }
}

#[tokio::test]
async fn malformed_query_string_is_json_400() {
    let (status, headers, body) = send(make_app(), get_req("/images?limit=1&limit=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    let json = json_body(&body);
    assert_eq!(json["error"], "Invalid query string");
    assert!(json["message"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn list_survives_presign_failure() {
    let (_, _, metadata) = memory_state();
    metadata
        .put_item(&record("a", "2024-01-01T00:00:00.000000"))
        .await
        .unwrap();
    let state = AppState {
        objects: Arc::new(NoLinkStore),
        metadata: metadata.clone(),
        url_expiry: Duration::from_secs(60),
    };
    let app = create_router(state, MAX_BODY);

    let (status, _, body) = send(app, get_req("/images")).await;
    assert_eq!(status, StatusCode::OK);
    let json = json_body(&body);
    assert_eq!(json["count"], 1);
    assert!(json["images"][0]["downloadUrl"].is_null());
}

#[tokio::test]
async fn get_unknown_image_returns_404() {
    let (status, headers, body) = send(make_app(), get_req("/images/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(body.as_ref(), br#"{"error":"Image not found"}"#);
}

#[tokio::test]
async fn uploaded_image_can_be_fetched() {
    let (state, _, _) = memory_state();
    let app = create_router(state, MAX_BODY);

    let (status, _, body) = send(
        app.clone(),
        multipart_req("/upload", multipart_body("dog.webp", None, b"woof")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json_body(&body)["imageId"].as_str().unwrap().to_string();

    let (status, _, body) = send(app, get_req(&format!("/images/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    let image = &json_body(&body)["image"];
    assert_eq!(image["imageId"], id.as_str());
    assert_eq!(image["contentType"], "image/webp");
    assert_eq!(image["size"], 4);
    assert!(image["downloadUrl"]
        .as_str()
        .unwrap()
        .starts_with(&format!(
            "https://{}.s3.us-east-1.amazonaws.com/images/{}.webp?",
            TEST_BUCKET, id
        )));
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_version() {
    let (status, _, body) = send(make_app(), get_req("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"status": "healthy", "version": env!("CARGO_PKG_VERSION")})
    );
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let (status, _, body) = send(make_app(), get_req("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body), json!({"error": "Not found"}));
}

#[tokio::test]
async fn wrong_method_returns_json_405() {
    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/images")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(make_app(), req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(json_body(&body), json!({"error": "Method not allowed"}));
}
