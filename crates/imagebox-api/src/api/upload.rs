//! Upload handler.
//!
//! Accepts `multipart/form-data` (the first file field is stored) and the
//! older JSON shape `{filename, content, contentType}` with base64 content.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use imagebox_multipart::{self as multipart, ExtractError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::ImageRecord;
use crate::error::ApiError;
use crate::storage::PutObject;

use super::images::{with_download_url, ImageView};
use super::router::AppState;

/// Extension used for storage keys when the filename has none.
const DEFAULT_EXTENSION: &str = "jpg";

/// A decoded upload, whichever way it arrived.
#[derive(Debug)]
struct NewUpload {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

/// Legacy JSON upload body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonUpload {
    filename: Option<String>,
    content: Option<String>,
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub image: ImageView,
}

/// POST /upload - Store an image and record its metadata
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let body = body.map_err(|rejection| {
        let status = rejection.status();
        let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Request body too large"
        } else {
            "Invalid request body"
        };
        ApiError::rejected(status, error, rejection.body_text())
    })?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let upload = if multipart::is_form_data(content_type) {
        from_multipart(&body, content_type)?
    } else if is_json(content_type) {
        from_json(&body)?
    } else {
        return Err(ApiError::bad_request(
            "Content-Type must be multipart/form-data",
        ));
    };

    store_upload(&state, upload).await
}

fn from_multipart(body: &[u8], content_type: &str) -> Result<NewUpload, ApiError> {
    let part = multipart::extract(body, content_type).map_err(|e| match e {
        ExtractError::NoBoundary => {
            ApiError::bad_request("No boundary found in Content-Type header")
        }
        ExtractError::NotFound => ApiError::bad_request("No file found in request"),
    })?;

    Ok(NewUpload {
        filename: part.filename,
        content_type: part.content_type,
        data: part.payload,
    })
}

fn from_json(body: &[u8]) -> Result<NewUpload, ApiError> {
    let parsed: JsonUpload = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;

    let (Some(filename), Some(content), Some(content_type)) =
        (parsed.filename, parsed.content, parsed.content_type)
    else {
        return Err(ApiError::bad_request(
            "Missing required fields: filename, content, contentType",
        ));
    };

    let data = multipart::RawBody::decode(&content, true)
        .map_err(|_| ApiError::bad_request("Field 'content' is not valid base64"))?
        .into_bytes();

    Ok(NewUpload {
        filename,
        content_type,
        data,
    })
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Storage key for an upload: `images/{id}.{ext}`.
///
/// The extension is whatever follows the filename's last `.`, or `jpg` when
/// there is none.
pub fn storage_key(image_id: &str, filename: &str) -> String {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or(DEFAULT_EXTENSION);
    format!("images/{}.{}", image_id, extension)
}

async fn store_upload(
    state: &AppState,
    upload: NewUpload,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let image_id = Uuid::new_v4().to_string();
    let s3_key = storage_key(&image_id, &upload.filename);
    let size = upload.data.len();

    let mut metadata = BTreeMap::new();
    metadata.insert("original-filename".to_string(), upload.filename.clone());
    metadata.insert("image-id".to_string(), image_id.clone());

    state
        .objects
        .put_object(PutObject {
            key: s3_key.clone(),
            body: upload.data,
            content_type: upload.content_type.clone(),
            metadata,
        })
        .await?;

    let record = ImageRecord {
        image_id,
        filename: upload.filename,
        content_type: upload.content_type,
        s3_key,
        size: i64::try_from(size).unwrap_or(i64::MAX),
        uploaded_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        bucket: state.objects.bucket().to_string(),
    };
    state.metadata.put_item(&record).await?;

    imagebox_telemetry::log_upload_stored!(
        image_id = %record.image_id,
        size,
        content_type = %record.content_type,
        "image uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded successfully",
            image: with_download_url(state, record),
        }),
    ))
}
