//! Defines routes for uploads, public objects, ads and media helpers.
//!
//! ## Structure
//! - **Probes**: `GET /healthz`, `GET /readyz`
//! - **Objects**
//!   - `POST   /api/admin/uploads/{bucket}`: multipart upload (admin)
//!   - `GET    /api/storage/{bucket}/public-url?path=`: resolve public URL
//!   - `GET    /storage/{bucket}/{*key}`: download a public object
//!   - `HEAD   /storage/{bucket}/{*key}`: object headers only
//! - **Ads**
//!   - `GET    /api/ads/{slot}`: ad selected for a placement slot
//!   - `GET    /api/admin/ads`, `POST /api/admin/ads`: list / create (admin)
//!   - `PUT    /api/admin/ads/{id}`, `DELETE /api/admin/ads/{id}` (admin)
//! - **Media helpers**
//!   - `GET    /api/media/classify?url=`
//!   - `GET    /api/youtube/resolve?url=`
//!
//! The wildcard `*key` allows nested keys like `posters/2025-...-img.png`.

use crate::{
    handlers::{
        ad_handlers::{create_ad, delete_ad, get_slot_ad, list_ads, update_ad},
        health_handlers::{healthz, readyz},
        media_handlers::{classify, resolve_youtube},
        object_handlers::{get_object, head_object, public_url, upload_object},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Largest accepted upload body (images, GIFs and short videos).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the router. Every handler receives the shared `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // objects
        .route(
            "/api/admin/uploads/{bucket}",
            post(upload_object).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/storage/{bucket}/public-url", get(public_url))
        .route("/storage/{bucket}/{*key}", get(get_object).head(head_object))
        // ads
        .route("/api/ads/{slot}", get(get_slot_ad))
        .route("/api/admin/ads", get(list_ads).post(create_ad))
        .route("/api/admin/ads/{id}", put(update_ad).delete(delete_ad))
        // media helpers
        .route("/api/media/classify", get(classify))
        .route("/api/youtube/resolve", get(resolve_youtube))
}
