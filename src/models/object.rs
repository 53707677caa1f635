//! Represents an object (file) stored in a bucket.

use super::media::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for a single object payload held by the local backend.
///
/// The struct stores metadata only; the bytes live on disk beneath the
/// configured storage directory.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ObjectRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Name of the bucket holding the object.
    pub bucket: String,

    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Content type (MIME type) recorded at upload time.
    pub content_type: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload, hex encoded.
    pub etag: String,

    /// Cache lifetime hint in seconds, served as `max-age`.
    pub cache_control: String,

    /// When this object was written.
    pub created_at: DateTime<Utc>,
}

/// Result of a successful upload.
///
/// Immutable once created; a re-upload produces a new key and a new value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub bucket: String,

    /// Object key inside `bucket`, exposed as `path` to API clients.
    #[serde(rename = "path")]
    pub key: String,

    /// `None` for private buckets.
    pub public_url: Option<String>,

    pub content_type: String,

    /// Kind derived from `content_type`, suitable for persisting next to the URL.
    pub media_kind: MediaKind,
}
