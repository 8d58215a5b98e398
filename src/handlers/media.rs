use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::parse_id;
use crate::{
    AppState,
    error::{AppError, AppResult},
    media::{content_type_for, is_external_url},
    models::MediaType,
};

const CACHE_FOREVER: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize, IntoParams)]
pub struct MediaPathParams {
    /// Stored media path (`/uploads/...`) or an external URL.
    pub path: Option<String>,
}

fn file_response(bytes: Vec<u8>, content_type: &'static str) -> Response {
    let length = bytes.len();
    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_FOREVER));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    response
}

/// Redirects to an external media URL. Targets that cannot be a `Location` header
/// (control characters after decoding) are rejected as bad input.
fn external_redirect(url: &str) -> AppResult<Response> {
    if HeaderValue::from_str(url).is_err() {
        return Err(AppError::Validation("Invalid file path".to_string()));
    }
    Ok(Redirect::temporary(url).into_response())
}

/// serve_media
///
/// [Public Route] Streams a stored file by path, or redirects when the path is an external
/// URL. Paths containing `..` are rejected before storage is touched.
#[utoipa::path(
    get,
    path = "/api/media",
    params(MediaPathParams),
    responses(
        (status = 200, description = "File bytes"),
        (status = 307, description = "Redirect to external URL"),
        (status = 400, description = "Missing or invalid path"),
        (status = 403, description = "Path escapes the media root"),
        (status = 404, description = "File not found")
    )
)]
pub async fn serve_media(
    State(state): State<AppState>,
    Query(params): Query<MediaPathParams>,
) -> AppResult<Response> {
    let path = params
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("File path is required".to_string()))?;

    if path.contains("..") {
        return Err(AppError::Validation("Invalid file path".to_string()));
    }
    if is_external_url(&path) {
        return external_redirect(&path);
    }

    let bytes = state.storage.get(&path).await?;
    let content_type = content_type_for(&path).unwrap_or("application/octet-stream");
    Ok(file_response(bytes, content_type))
}

/// serve_media_by_id
///
/// [Authenticated Route] Streams a media record's file; external media redirect.
#[utoipa::path(
    get,
    path = "/api/media/{id}",
    params(("id" = i32, Path, description = "Media ID")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 307, description = "Redirect to external URL"),
        (status = 404, description = "Media not found")
    )
)]
pub async fn serve_media_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "media")?;
    let media = state
        .repo
        .get_media(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

    if is_external_url(&media.url) {
        return external_redirect(&media.url);
    }

    let bytes = state.storage.get(&media.url).await?;
    let content_type = content_type_for(&media.url).unwrap_or(match media.media_type {
        MediaType::Image => "image/jpeg",
        MediaType::Video => "video/mp4",
    });
    Ok(file_response(bytes, content_type))
}
