/**
 * File Routes
 * Uploads (multipart or inline base64), listing and deletion of stored files
 */
use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use super::auth::Viewer;
use super::middleware::{ApiQuery, ValidatedJson};
use super::SuccessResponse;
use crate::db::models::{FileRecord, NewFile};
use crate::db::{Page, Repository};
use crate::error::{ApiError, ApiResult};
use crate::query::Scope;
use crate::state::AppState;

/// Inline upload: the file bytes as base64, optionally as a `data:` URL.
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InlineFile {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub data: String,
}

fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        // PDF: %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Some("application/pdf"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Strips an optional `data:<mime>;base64,` prefix and decodes the rest.
fn decode_inline(data: &str) -> ApiResult<Vec<u8>> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::bad_request("File data is not valid base64").field("data").reason(e.to_string()))
}

/// Checks the payload, writes it under a generated name, then records it.
/// The written file is removed again when the insert fails.
async fn store(state: &AppState, original_name: &str, bytes: &[u8], keep_data: bool) -> ApiResult<Value> {
    let storage = &state.config.storage;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Empty file").field("file"));
    }
    if bytes.len() > storage.max_upload_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("File too large. Maximum size is {} bytes", storage.max_upload_bytes),
        )
        .field("file"));
    }
    let mime = detect_mime(bytes).ok_or_else(|| {
        ApiError::bad_request("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF, PDF")
            .field("file")
    })?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for(mime));
    tokio::fs::create_dir_all(&storage.dir).await?;
    let file_path = storage.dir.join(&filename);
    tokio::fs::write(&file_path, bytes).await.map_err(|e| {
        tracing::error!("Failed to write upload file {:?}: {}", file_path, e);
        ApiError::from(e)
    })?;

    let record = NewFile {
        name: original_name.to_string(),
        url: state.config.file_url(&filename),
        path: filename.clone(),
        file_type: mime.to_string(),
        size: bytes.len() as i64,
        data: keep_data.then(|| STANDARD.encode(bytes)),
    };
    if let Err(e) = record.validate() {
        remove_stored(&storage.dir, &filename).await;
        return Err(e.into());
    }

    match Repository::<FileRecord>::new(state.db.clone()).create(&record).await {
        Ok(doc) => {
            tracing::info!("File stored: {} ({} bytes, {})", filename, bytes.len(), mime);
            Ok(doc)
        }
        Err(e) => {
            remove_stored(&storage.dir, &filename).await;
            Err(e)
        }
    }
}

/// Best-effort removal; a missing file is not an error.
async fn remove_stored(dir: &FsPath, name: &str) {
    if !is_safe_name(name) {
        tracing::warn!("Refusing to remove suspicious stored path: {}", name);
        return;
    }
    let path: PathBuf = dir.join(name);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove stored file {:?}: {}", path, e);
        }
    }
}

/// POST /api/files/upload
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        upload = Some((file_name, field.bytes().await?));
        break;
    }
    let (name, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file provided").field("file"))?;

    let doc = store(&state, &name, &bytes, false).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// POST /api/files
pub async fn create_file(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<InlineFile>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let bytes = decode_inline(&payload.data)?;
    let doc = store(&state, &payload.name, &bytes, true).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Anonymous readers get file metadata without the inline `data`.
fn file_scope(viewer: &Viewer) -> Scope {
    if viewer.is_admin() {
        Scope::default()
    } else {
        Scope::default().public()
    }
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    viewer: Viewer,
    ApiQuery(options): ApiQuery,
) -> ApiResult<Json<Page>> {
    let page = Repository::<FileRecord>::new(state.db.clone())
        .find_many_scoped(&file_scope(&viewer), &options)
        .await?;
    Ok(Json(page))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    ApiQuery(options): ApiQuery,
) -> ApiResult<Json<Value>> {
    let doc = Repository::<FileRecord>::new(state.db.clone())
        .find_by_id_scoped(id, Some(&file_scope(&viewer)), &options)
        .await?;
    Ok(Json(doc))
}

/// DELETE /api/files/{id}
///
/// Deletes the record, then the stored bytes. Content pointing at the file
/// loses its reference.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse>> {
    let repo = Repository::<FileRecord>::new(state.db.clone());
    let record = repo.get(id).await?;
    repo.delete(id).await?;
    remove_stored(&state.config.storage.dir, &record.path).await;
    tracing::info!("File deleted: {} ({})", record.name, record.path);
    Ok(Json(SuccessResponse { success: true }))
}
