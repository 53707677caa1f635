//! Stateless media helpers.

use crate::{
    errors::AppError,
    extract::ValidatedQuery,
    models::media::MediaKind,
    services::{
        media_resolver,
        youtube::{self, YoutubeVideo},
    },
};
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub kind: MediaKind,
}

/// `GET /api/media/classify?url=...`
pub async fn classify(ValidatedQuery(q): ValidatedQuery<UrlQuery>) -> Json<ClassifyResponse> {
    Json(ClassifyResponse {
        kind: media_resolver::classify(q.url.as_deref()),
    })
}

/// `GET /api/youtube/resolve?url=...`
pub async fn resolve_youtube(
    ValidatedQuery(q): ValidatedQuery<UrlQuery>,
) -> Result<Json<YoutubeVideo>, AppError> {
    q.url
        .as_deref()
        .and_then(youtube::resolve)
        .map(Json)
        .ok_or_else(|| AppError::new(StatusCode::UNPROCESSABLE_ENTITY, "Invalid YouTube URL"))
}
