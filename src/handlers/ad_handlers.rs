//! Advertisement endpoints: public slot lookup and admin management.

use crate::{
    auth::AdminSession,
    errors::AppError,
    extract::{ValidatedJson, ValidatedPath},
    models::{
        advertisement::{Advertisement, AdvertisementInput, PlacementSlot},
        media::MediaKind,
    },
    services::media_resolver,
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use uuid::Uuid;

/// An advertisement plus how its media should be rendered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdView {
    #[serde(flatten)]
    pub ad: Advertisement,
    pub render_kind: MediaKind,
}

impl From<Advertisement> for AdView {
    fn from(ad: Advertisement) -> Self {
        let render_kind = media_resolver::resolve(ad.media_kind, Some(&ad.media_url));
        Self { ad, render_kind }
    }
}

#[derive(Debug, Serialize)]
pub struct SlotAdResponse {
    pub ad: Option<AdView>,
}

/// `GET /api/ads/{slot}`: the ad to show in a slot; `ad` is null when none.
pub async fn get_slot_ad(
    State(state): State<AppState>,
    ValidatedPath(slot): ValidatedPath<PlacementSlot>,
) -> Result<Json<SlotAdResponse>, AppError> {
    let ad = state.ads.select_ad(slot).await?;
    Ok(Json(SlotAdResponse {
        ad: ad.map(AdView::from),
    }))
}

/// `GET /api/admin/ads`
pub async fn list_ads(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<AdView>>, AppError> {
    let ads = state.ads.list_ads().await?;
    Ok(Json(ads.into_iter().map(AdView::from).collect()))
}

/// `POST /api/admin/ads`
pub async fn create_ad(
    State(state): State<AppState>,
    session: AdminSession,
    ValidatedJson(input): ValidatedJson<AdvertisementInput>,
) -> Result<(StatusCode, Json<AdView>), AppError> {
    let ad = state.ads.create_ad(input).await?;
    tracing::info!(id = %ad.id, admin = %session.fingerprint, "ad created via api");
    Ok((StatusCode::CREATED, Json(ad.into())))
}

/// `PUT /api/admin/ads/{id}`
pub async fn update_ad(
    State(state): State<AppState>,
    session: AdminSession,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(input): ValidatedJson<AdvertisementInput>,
) -> Result<Json<AdView>, AppError> {
    let ad = state.ads.update_ad(id, input).await?;
    tracing::info!(id = %ad.id, admin = %session.fingerprint, "ad updated via api");
    Ok(Json(ad.into()))
}

/// `DELETE /api/admin/ads/{id}`
pub async fn delete_ad(
    State(state): State<AppState>,
    session: AdminSession,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ads.delete_ad(id).await?;
    tracing::info!(id = %id, admin = %session.fingerprint, "ad deleted via api");
    Ok(StatusCode::NO_CONTENT)
}
