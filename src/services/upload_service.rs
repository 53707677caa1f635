//! Upload flow: generate a fresh key, write once, resolve the public URL.

use crate::{
    models::object::StoredObject,
    services::{
        media_resolver,
        object_key::{self, DEFAULT_PREFIX},
        object_storage::{ObjectStorage, PutOptions, StorageError},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Cache lifetime hint sent with every upload (one hour).
pub const CACHE_CONTROL_SECONDS: &str = "3600";
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("bucket name must not be empty")]
    InvalidBucket,
    /// Backend failure, passed through unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A file received from a client.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// Logical folder for the key; `uploads` when absent.
    pub prefix: Option<String>,
    pub upsert: bool,
}

#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn ObjectStorage>,
}

impl UploadService {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Store `file` in `bucket` under a freshly generated key.
    ///
    /// Performs exactly one backend write. Errors from the backend are
    /// returned as-is; there is no retry.
    pub async fn upload(
        &self,
        bucket: &str,
        file: UploadFile,
        options: UploadOptions,
    ) -> Result<StoredObject, UploadError> {
        if bucket.trim().is_empty() {
            return Err(UploadError::InvalidBucket);
        }

        let prefix = options
            .prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PREFIX);
        let key = object_key::generate_key(prefix, &file.name);
        let content_type = file
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        let put = PutOptions {
            cache_control: CACHE_CONTROL_SECONDS.to_string(),
            upsert: options.upsert,
            content_type: content_type.clone(),
        };
        debug!(bucket, key = %key, content_type = %content_type, "uploading object");
        self.storage.upload(bucket, &key, file.bytes, &put).await?;

        let public_url = self.storage.public_url(bucket, &key);
        info!(bucket, key = %key, public = public_url.is_some(), "upload complete");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            media_kind: media_resolver::from_content_type(&content_type),
            key,
            public_url,
            content_type,
        })
    }

    /// Public URL of an existing object, `None` for private buckets.
    pub fn public_url(&self, bucket: &str, path: &str) -> Option<String> {
        self.storage.public_url(bucket, path)
    }
}
