//! Image listing and lookup handlers.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::ImageRecord;
use crate::error::ApiError;

use super::router::AppState;

/// Number of records returned by `GET /images` without a `limit`.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound applied to any requested `limit`.
pub const MAX_LIST_LIMIT: usize = 1000;

/// A metadata record plus a freshly generated download link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    #[serde(flatten)]
    pub image: ImageRecord,
    /// `None` when the link could not be generated.
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    /// Kept as text so a malformed value yields our own 400 body.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListImagesResponse {
    pub count: usize,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Serialize)]
pub struct GetImageResponse {
    pub image: ImageView,
}

/// GET /images - List recent uploads
pub async fn list_images(
    State(state): State<AppState>,
    query: Result<Query<ListImagesQuery>, QueryRejection>,
) -> Result<Json<ListImagesResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::rejected(rejection.status(), "Invalid query string", rejection.body_text())
    })?;
    let limit = parse_limit(query.limit.as_deref())?;
    let records = state.metadata.scan(limit).await?;

    let images: Vec<ImageView> = records
        .into_iter()
        .map(|record| with_download_url(&state, record))
        .collect();

    Ok(Json(ListImagesResponse {
        count: images.len(),
        images,
    }))
}

/// GET /images/{id} - Fetch one upload
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GetImageResponse>, ApiError> {
    let record = state
        .metadata
        .get_item(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;

    Ok(Json(GetImageResponse {
        image: with_download_url(&state, record),
    }))
}

fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_LIST_LIMIT);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ApiError::bad_request("Invalid limit")),
        Ok(n) => Ok(n.min(MAX_LIST_LIMIT)),
    }
}

pub(super) fn with_download_url(state: &AppState, image: ImageRecord) -> ImageView {
    let download_url = match state.objects.presign_get(&image.s3_key, state.url_expiry) {
        Ok(url) => Some(url),
        Err(e) => {
            imagebox_telemetry::log_presign_failed!(
                image_id = %image.image_id,
                error = %e,
                "download link unavailable"
            );
            None
        }
    };
    ImageView {
        image,
        download_url,
    }
}
