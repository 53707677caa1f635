//! Storage backend abstraction used by the upload service.
//!
//! A backend only has to accept a single-object write and resolve the public
//! URL of a key. Everything else (key generation, defaults) lives above it.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("object `{key}` already exists in bucket `{bucket}`")]
    ObjectAlreadyExists { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    /// Failure reported by a remote backend, message passed through as-is.
    /// The local backend reports its own failures as `Sqlx` or `Io`.
    #[error("upload failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Options forwarded with every write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOptions {
    /// Cache lifetime hint in seconds.
    pub cache_control: String,
    /// Replace an existing object under the same key instead of failing.
    pub upsert: bool,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `body` to `bucket` under `key`. Exactly one object is created or
    /// replaced on success; nothing is left behind on failure.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: &PutOptions,
    ) -> StorageResult<()>;

    /// Public URL for `key`, or `None` when the bucket is not publicly readable.
    fn public_url(&self, bucket: &str, key: &str) -> Option<String>;
}
