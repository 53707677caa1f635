//! HTTP handlers for uploads and public object reads.
//! Uploads go through `UploadService`; reads stream payloads straight from
//! the local backend.

use crate::{
    auth::AdminSession,
    errors::AppError,
    extract::{ValidatedPath, ValidatedQuery},
    models::object::{ObjectRecord, StoredObject},
    services::upload_service::{UploadFile, UploadOptions},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct PublicUrlQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUrlResponse {
    pub public_url: Option<String>,
}

/// `POST /api/admin/uploads/{bucket}`: multipart upload.
///
/// Fields: `file` (required), `prefix` and `upsert` (optional).
pub async fn upload_object(
    State(state): State<AppState>,
    session: AdminSession,
    ValidatedPath(bucket): ValidatedPath<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredObject>), AppError> {
    let mut file = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                file = Some(UploadFile {
                    name: filename,
                    content_type,
                    bytes,
                });
            }
            "prefix" => {
                let prefix = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                options.prefix = Some(prefix.trim().to_string());
            }
            "upsert" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.to_string()))?;
                options.upsert = matches!(value.trim(), "true" | "1" | "on");
            }
            other => tracing::debug!("ignoring multipart field `{}`", other),
        }
    }

    let file = file.ok_or_else(|| AppError::bad_request("multipart field `file` is required"))?;
    tracing::info!(
        bucket = %bucket,
        filename = %file.name,
        admin = %session.fingerprint,
        "upload requested"
    );

    let stored = state.uploads.upload(&bucket, file, options).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/storage/{bucket}/public-url?path=...`
pub async fn public_url(
    State(state): State<AppState>,
    ValidatedPath(bucket): ValidatedPath<String>,
    ValidatedQuery(q): ValidatedQuery<PublicUrlQuery>,
) -> Json<PublicUrlResponse> {
    Json(PublicUrlResponse {
        public_url: state.uploads.public_url(&bucket, &q.path),
    })
}

/// `GET /storage/{bucket}/{*key}`: stream a public object.
pub async fn get_object(
    State(state): State<AppState>,
    ValidatedPath((bucket, key)): ValidatedPath<(String, String)>,
) -> Result<Response, AppError> {
    let (meta, file) = state.storage.get_object_reader(&bucket, &key).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);

    Ok(response)
}

/// `HEAD /storage/{bucket}/{*key}`: same headers as GET but no body.
pub async fn head_object(
    State(state): State<AppState>,
    ValidatedPath((bucket, key)): ValidatedPath<(String, String)>,
) -> Result<Response, AppError> {
    let meta = state.storage.get_object_metadata(&bucket, &key).await?;
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);

    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectRecord) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(meta.size_bytes.max(0) as u64),
    );

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", meta.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", meta.cache_control)) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    if let Ok(value) = HeaderValue::from_str(&meta.created_at.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
