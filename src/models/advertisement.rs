//! Advertisements shown in named placement slots.

use super::media::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// A UI location where at most one advertisement is rendered.
#[derive(Serialize, Deserialize, sqlx::Type, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PlacementSlot {
    YoutubeTop,
    YoutubeBottom,
    PromptsBottom,
}

impl PlacementSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementSlot::YoutubeTop => "youtube_top",
            PlacementSlot::YoutubeBottom => "youtube_bottom",
            PlacementSlot::PromptsBottom => "prompts_bottom",
        }
    }
}

impl fmt::Display for PlacementSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator-managed advertisement.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: Uuid,

    pub title: String,

    /// Image or video URL, usually the `publicUrl` of an upload.
    pub media_url: String,

    /// Click-through target; the banner is not a link when absent.
    pub link_url: Option<String>,

    pub placement_slot: PlacementSlot,

    pub active: bool,

    /// Explicit kind captured when the media was uploaded. `None` means the
    /// kind is derived from `media_url` at render time.
    pub media_kind: Option<MediaKind>,

    pub created_at: DateTime<Utc>,
}

/// Editable fields of an advertisement, used for both create and update.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementInput {
    pub title: String,
    pub media_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    pub placement_slot: PlacementSlot,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
}

fn default_active() -> bool {
    true
}
