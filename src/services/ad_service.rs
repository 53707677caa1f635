//! AdService: advertisement storage and per-slot selection.
//!
//! The most recently created active ad in a slot wins, re-evaluated on every
//! request. No rotation or weighting.

use crate::models::advertisement::{Advertisement, AdvertisementInput, PlacementSlot};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const AD_COLUMNS: &str =
    "id, title, media_url, link_url, placement_slot, active, media_kind, created_at";

#[derive(Debug, Error)]
pub enum AdError {
    #[error("invalid advertisement: {0}")]
    Invalid(String),
    #[error("advertisement `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

pub type AdResult<T> = Result<T, AdError>;

#[derive(Clone)]
pub struct AdService {
    db: Arc<SqlitePool>,
}

impl AdService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// The active ad to render in `slot`, if any.
    ///
    /// Ordered by `created_at` descending; rows created at the same instant
    /// fall back to insertion order, newest first.
    pub async fn select_ad(&self, slot: PlacementSlot) -> AdResult<Option<Advertisement>> {
        let sql = format!(
            "SELECT {AD_COLUMNS} FROM ads
             WHERE placement_slot = ? AND active = 1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1"
        );
        let ad = sqlx::query_as::<_, Advertisement>(&sql)
            .bind(slot)
            .fetch_optional(&*self.db)
            .await?;
        debug!(slot = %slot, found = ad.is_some(), "selected ad");
        Ok(ad)
    }

    /// Every ad, newest first.
    pub async fn list_ads(&self) -> AdResult<Vec<Advertisement>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads ORDER BY created_at DESC, rowid DESC");
        Ok(sqlx::query_as::<_, Advertisement>(&sql)
            .fetch_all(&*self.db)
            .await?)
    }

    pub async fn create_ad(&self, input: AdvertisementInput) -> AdResult<Advertisement> {
        let input = validate(input)?;
        let sql = format!(
            "INSERT INTO ads ({AD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {AD_COLUMNS}"
        );
        let ad = sqlx::query_as::<_, Advertisement>(&sql)
            .bind(Uuid::new_v4())
            .bind(&input.title)
            .bind(&input.media_url)
            .bind(&input.link_url)
            .bind(input.placement_slot)
            .bind(input.active)
            .bind(input.media_kind)
            .bind(Utc::now())
            .fetch_one(&*self.db)
            .await?;
        info!(id = %ad.id, slot = %ad.placement_slot, "advertisement created");
        Ok(ad)
    }

    /// Replace the editable fields of an ad. `created_at` is kept, so an edit
    /// does not move the ad to the front of its slot.
    pub async fn update_ad(&self, id: Uuid, input: AdvertisementInput) -> AdResult<Advertisement> {
        let input = validate(input)?;
        let sql = format!(
            "UPDATE ads SET
                title = ?, media_url = ?, link_url = ?, placement_slot = ?,
                active = ?, media_kind = ?
             WHERE id = ?
             RETURNING {AD_COLUMNS}"
        );
        let ad = sqlx::query_as::<_, Advertisement>(&sql)
            .bind(&input.title)
            .bind(&input.media_url)
            .bind(&input.link_url)
            .bind(input.placement_slot)
            .bind(input.active)
            .bind(input.media_kind)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(AdError::NotFound(id))?;
        info!(id = %ad.id, active = ad.active, "advertisement updated");
        Ok(ad)
    }

    pub async fn delete_ad(&self, id: Uuid) -> AdResult<()> {
        let result = sqlx::query("DELETE FROM ads WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AdError::NotFound(id));
        }
        info!(id = %id, "advertisement deleted");
        Ok(())
    }
}

/// Trim text fields and require a title and media URL.
fn validate(mut input: AdvertisementInput) -> AdResult<AdvertisementInput> {
    input.title = input.title.trim().to_string();
    input.media_url = input.media_url.trim().to_string();
    input.link_url = input
        .link_url
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty());

    if input.title.is_empty() {
        return Err(AdError::Invalid("title is required".into()));
    }
    if input.media_url.is_empty() {
        return Err(AdError::Invalid("media must be uploaded first".into()));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, models::media::MediaKind};
    use chrono::{DateTime, Duration, TimeZone};

    fn input(title: &str, slot: PlacementSlot) -> AdvertisementInput {
        AdvertisementInput {
            title: title.into(),
            media_url: format!("https://cdn.example.com/{title}.png"),
            link_url: None,
            placement_slot: slot,
            active: true,
            media_kind: None,
        }
    }

    async fn service() -> AdService {
        AdService::new(Arc::new(test_pool().await))
    }

    /// Insert a row with an explicit creation time.
    async fn seed(
        ads: &AdService,
        slot: PlacementSlot,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO ads (
                id, title, media_url, link_url, placement_slot, active, media_kind, created_at
             )
             VALUES (?, 'seeded', 'https://x/a.png', NULL, ?, ?, NULL, ?)",
        )
        .bind(id)
        .bind(slot)
        .bind(active)
        .bind(created_at)
        .execute(&*ads.db)
        .await
        .unwrap();
        id
    }

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn newest_active_ad_wins() {
        let ads = service().await;
        let _older = seed(&ads, PlacementSlot::YoutubeTop, true, t(1)).await;
        let newer = seed(&ads, PlacementSlot::YoutubeTop, true, t(2)).await;

        let selected = ads.select_ad(PlacementSlot::YoutubeTop).await.unwrap();
        assert_eq!(selected.map(|ad| ad.id), Some(newer));
    }

    #[tokio::test]
    async fn inactive_and_other_slots_are_ignored() {
        let ads = service().await;
        let expected = seed(&ads, PlacementSlot::YoutubeTop, true, t(1)).await;
        seed(&ads, PlacementSlot::YoutubeTop, false, t(5)).await;
        seed(&ads, PlacementSlot::PromptsBottom, true, t(9)).await;

        let selected = ads.select_ad(PlacementSlot::YoutubeTop).await.unwrap();
        assert_eq!(selected.map(|ad| ad.id), Some(expected));
    }

    #[tokio::test]
    async fn empty_slot_selects_nothing() {
        let ads = service().await;
        seed(&ads, PlacementSlot::YoutubeTop, false, t(1)).await;

        assert!(ads.select_ad(PlacementSlot::YoutubeTop).await.unwrap().is_none());
        assert!(ads.select_ad(PlacementSlot::YoutubeBottom).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identical_timestamps_prefer_latest_insert() {
        let ads = service().await;
        seed(&ads, PlacementSlot::YoutubeBottom, true, t(3)).await;
        let last = seed(&ads, PlacementSlot::YoutubeBottom, true, t(3)).await;

        let selected = ads.select_ad(PlacementSlot::YoutubeBottom).await.unwrap();
        assert_eq!(selected.map(|ad| ad.id), Some(last));
    }

    #[tokio::test]
    async fn create_update_delete_round() {
        let ads = service().await;
        let mut new_ad = input("banner", PlacementSlot::PromptsBottom);
        new_ad.link_url = Some("  https://example.com  ".into());
        new_ad.media_kind = Some(MediaKind::Video);

        let created = ads.create_ad(new_ad).await.unwrap();
        assert_eq!(created.link_url.as_deref(), Some("https://example.com"));
        assert_eq!(created.media_kind, Some(MediaKind::Video));
        assert!(created.active);

        let mut edit = input("banner v2", PlacementSlot::PromptsBottom);
        edit.active = false;
        let updated = ads.update_ad(created.id, edit).await.unwrap();
        assert_eq!(updated.title, "banner v2");
        assert!(!updated.active);
        assert_eq!(updated.created_at, created.created_at);
        assert!(ads.select_ad(PlacementSlot::PromptsBottom).await.unwrap().is_none());

        ads.delete_ad(created.id).await.unwrap();
        assert!(ads.list_ads().await.unwrap().is_empty());
        assert!(matches!(
            ads.delete_ad(created.id).await,
            Err(AdError::NotFound(id)) if id == created.id
        ));
    }

    #[tokio::test]
    async fn update_of_unknown_ad_is_not_found() {
        let ads = service().await;
        let missing = Uuid::new_v4();
        let err = ads
            .update_ad(missing, input("x", PlacementSlot::YoutubeTop))
            .await
            .unwrap_err();
        assert!(matches!(err, AdError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn create_requires_title_and_media() {
        let ads = service().await;

        let mut no_media = input("promo", PlacementSlot::YoutubeTop);
        no_media.media_url = " ".into();
        assert!(matches!(ads.create_ad(no_media).await, Err(AdError::Invalid(_))));

        let no_title = input("", PlacementSlot::YoutubeTop);
        assert!(matches!(ads.create_ad(no_title).await, Err(AdError::Invalid(_))));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let ads = service().await;
        let a = seed(&ads, PlacementSlot::YoutubeTop, true, t(1)).await;
        let b = seed(&ads, PlacementSlot::PromptsBottom, false, t(2)).await;
        let c = seed(&ads, PlacementSlot::YoutubeBottom, true, t(1) - Duration::minutes(30)).await;

        let ids: Vec<Uuid> = ads.list_ads().await.unwrap().into_iter().map(|ad| ad.id).collect();
        assert_eq!(ids, vec![b, a, c]);
    }
}
