use std::collections::HashSet;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    http::{StatusCode, header},
};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Media, MediaType, NewMedia, UpdateMediaInput},
    storage::StorageState,
};

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "mp4", "webm", "mov", "avi",
];

const PRODUCT_DATA_FIELD: &str = "productData";
const MEDIA_FIELD_PREFIX: &str = "media_";
pub const LOCAL_URL_PREFIX: &str = "/uploads/";

/// A validated file part of a product form, not yet written to storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub extension: String,
    pub content_type: String,
    pub media_type: MediaType,
    pub sort_order: i32,
    pub bytes: Vec<u8>,
}

/// ProductSubmission
///
/// A create/update body decoded either from JSON or from a multipart form (`productData`
/// JSON field plus `media_<n>` file fields). JSON submissions never carry files.
#[derive(Debug)]
pub struct ProductSubmission<T> {
    pub data: T,
    pub files: Vec<UploadedFile>,
}

/// read_product_submission
///
/// Decodes the request body by content type. Every file is checked for extension and size
/// before the caller writes anything.
pub async fn read_product_submission<T: DeserializeOwned>(
    request: Request,
    max_upload_bytes: usize,
) -> AppResult<ProductSubmission<T>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        let Json(data) = Json::<T>::from_request(request, &())
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        return Ok(ProductSubmission {
            data,
            files: Vec::new(),
        });
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let mut product_data: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == PRODUCT_DATA_FIELD {
            product_data = Some(field.text().await.map_err(multipart_error)?);
        } else if let Some(suffix) = name.strip_prefix(MEDIA_FIELD_PREFIX) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;

            files.push(validate_upload(
                file_name,
                content_type,
                sort_order_from_suffix(suffix),
                bytes.to_vec(),
                max_upload_bytes,
            )?);
        }
    }

    let raw = product_data
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Product data is required".to_string()))?;
    let data = serde_json::from_str(&raw)
        .map_err(|e| AppError::Validation(format!("Invalid product data: {e}")))?;

    Ok(ProductSubmission { data, files })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// `media_3` sorts at 3; anything unparseable sorts at 0.
fn sort_order_from_suffix(suffix: &str) -> i32 {
    suffix
        .split('_')
        .next()
        .and_then(|n| n.parse::<i32>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(0)
}

pub fn validate_upload(
    file_name: String,
    content_type: String,
    sort_order: i32,
    bytes: Vec<u8>,
    max_upload_bytes: usize,
) -> AppResult<UploadedFile> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "File type not allowed: {file_name}. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if bytes.len() > max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File {file_name} exceeds the maximum size of {max_upload_bytes} bytes"
        )));
    }

    Ok(UploadedFile {
        file_name,
        extension,
        media_type: MediaType::from_content_type(&content_type),
        content_type,
        sort_order,
        bytes,
    })
}

pub fn product_upload_key(product_id: i32, extension: &str) -> String {
    format!("uploads/products/{}/{}.{}", product_id, Uuid::new_v4(), extension)
}

/// store_uploads
///
/// Writes every file under the product's upload prefix and returns the media rows to
/// record. If one write fails, the files already written are removed again.
pub async fn store_uploads(
    storage: &StorageState,
    product_id: i32,
    files: Vec<UploadedFile>,
) -> AppResult<Vec<NewMedia>> {
    let mut stored: Vec<String> = Vec::with_capacity(files.len());
    let mut media = Vec::with_capacity(files.len());

    for file in files {
        let key = product_upload_key(product_id, &file.extension);
        if let Err(e) = storage.put(&key, file.bytes, &file.content_type).await {
            for written in &stored {
                if let Err(cleanup) = storage.delete(written).await {
                    tracing::warn!(key = %written, error = %cleanup, "failed to roll back upload");
                }
            }
            return Err(e.into());
        }

        media.push(NewMedia {
            url: format!("/{key}"),
            media_type: file.media_type,
            sort_order: file.sort_order,
            provider: "local".to_string(),
            metadata: None,
        });
        stored.push(key);
    }

    Ok(media)
}

pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn provider_for_url(url: &str) -> &'static str {
    if url.starts_with(LOCAL_URL_PREFIX) {
        "local"
    } else {
        "external"
    }
}

/// Storage key of a locally stored media URL (`/uploads/...`), `None` for anything else.
pub fn local_key(url: &str) -> Option<String> {
    url.starts_with(LOCAL_URL_PREFIX)
        .then(|| url.trim_start_matches('/').to_string())
}

/// media_url
///
/// Public URL for a stored media path: external URLs are returned unchanged, local paths
/// are routed through the media endpoint.
pub fn media_url(path: &str) -> String {
    if is_external_url(path) {
        return path.to_string();
    }
    reqwest::Url::parse_with_params("http://localhost/api/media", &[("path", path)])
        .ok()
        .and_then(|url| url.query().map(|q| format!("/api/media?{q}")))
        .unwrap_or_else(|| format!("/api/media?path={path}"))
}

pub fn content_type_for(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(content_type)
}

/// merge_media
///
/// Final media list of an update: the media the form kept plus the new uploads, ordered by
/// requested sort order (stable), re-indexed from 0, with provider derived from the URL.
pub fn merge_media(kept: Vec<UpdateMediaInput>, uploaded: Vec<NewMedia>) -> Vec<NewMedia> {
    let mut all: Vec<NewMedia> = kept
        .into_iter()
        .map(|m| NewMedia {
            url: m.url,
            media_type: m.media_type,
            sort_order: m.sort_order,
            provider: String::new(),
            metadata: None,
        })
        .chain(uploaded)
        .collect();

    all.sort_by_key(|m| m.sort_order);
    for (index, item) in all.iter_mut().enumerate() {
        item.sort_order = index as i32;
        item.provider = provider_for_url(&item.url).to_string();
    }
    all
}

/// Local files attached before an update that the new media list no longer references.
pub fn orphaned_keys(previous: &[Media], current: &[NewMedia]) -> Vec<String> {
    let kept: HashSet<&str> = current.iter().map(|m| m.url.as_str()).collect();
    previous
        .iter()
        .filter(|m| !kept.contains(m.url.as_str()))
        .filter_map(|m| local_key(&m.url))
        .collect()
}

/// spawn_file_cleanup
///
/// Deletes the given storage keys in a detached task. Failures are logged and otherwise
/// ignored; the caller has already answered the request.
pub fn spawn_file_cleanup(storage: StorageState, keys: Vec<String>) -> Option<JoinHandle<()>> {
    if keys.is_empty() {
        return None;
    }
    Some(tokio::spawn(async move {
        for key in keys {
            match storage.delete(&key).await {
                Ok(()) => tracing::debug!(key = %key, "deleted orphaned media file"),
                Err(e) => tracing::warn!(key = %key, error = %e, "failed to delete media file"),
            }
        }
    }))
}
