//! src/services/storage_service.rs
//!
//! StorageService: the local object storage backend. Object metadata lives in
//! SQLite, payloads on disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`. Buckets are declared up front
//! in configuration as public or private.

use crate::{
    models::object::ObjectRecord,
    services::object_storage::{ObjectStorage, PutOptions, StorageError, StorageResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Declared bucket and whether its objects are publicly readable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketPolicy {
    pub name: String,
    pub public: bool,
}

impl BucketPolicy {
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
        }
    }

    pub fn private(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: false,
        }
    }
}

/// StorageService provides the write/read operations the upload flow needs:
/// - Put an object (writes bytes to disk and inserts metadata into SQLite)
/// - Resolve the public URL of an object
/// - Read an object back for serving over HTTP
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    /// Origin used to build public URLs, without trailing slash.
    public_base_url: String,

    /// Declared buckets keyed by name; the value is the public flag.
    buckets: Arc<HashMap<String, bool>>,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

impl StorageService {
    /// Create a new StorageService backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    ///
    /// Every declared bucket name is validated here so a bad configuration
    /// fails at start-up rather than on first upload.
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        buckets: impl IntoIterator<Item = BucketPolicy>,
    ) -> StorageResult<Self> {
        let mut declared = HashMap::new();
        for policy in buckets {
            ensure_bucket_name_safe(&policy.name)?;
            declared.insert(policy.name, policy.public);
        }

        Ok(Self {
            db,
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            buckets: Arc::new(declared),
        })
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin with `/`, have a `.` or `..` path segment, or
    /// contain control characters or backslashes. Dots inside a segment
    /// (`final..v2.png`) are fine.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.split('/').any(|segment| matches!(segment, "." | "..")) {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Look up a declared bucket, returning its public flag.
    fn resolve_bucket(&self, bucket: &str) -> StorageResult<bool> {
        ensure_bucket_name_safe(bucket)?;
        self.buckets
            .get(bucket)
            .copied()
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))
    }

    /// Compute the physical base folder path for a bucket.
    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(bucket_name);
        path
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(bucket/key) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff).
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified object payload path.
    ///
    /// Combines base_path/bucket/{shard}/{shard}/{key}.
    /// Parent directories may not exist yet.
    fn object_path(&self, bucket_name: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.bucket_root(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Fetch object metadata by bucket and key.
    async fn fetch_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectRecord> {
        sqlx::query_as::<_, ObjectRecord>(
            "SELECT id, bucket, key, content_type, size_bytes, etag, cache_control, created_at
             FROM objects
             WHERE bucket = ? AND key = ?",
        )
        .bind(bucket)
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    /// Write an object payload and record its metadata.
    ///
    /// - Writes bytes to a temporary file and fsyncs it.
    /// - Inserts (or, with `upsert`, replaces) the metadata row in a transaction.
    /// - Parks any payload already stored under the key, renames the new
    ///   payload into place, then commits.
    ///
    /// Any failure removes the temporary file, rolls the row back and puts a
    /// parked payload back where it was.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: &PutOptions,
    ) -> StorageResult<ObjectRecord> {
        self.ensure_key_safe(key)?;
        self.resolve_bucket(bucket)?;

        let file_path = self.object_path(bucket, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        match self
            .commit_object(&tmp_path, &file_path, bucket, key, body, options)
            .await
        {
            Ok(record) => {
                debug!("stored payload at {}", file_path.display());
                Ok(record)
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(err)
            }
        }
    }

    async fn commit_object(
        &self,
        tmp_path: &Path,
        file_path: &Path,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: &PutOptions,
    ) -> StorageResult<ObjectRecord> {
        let mut file = File::create(tmp_path).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let etag = format!("{:x}", md5::compute(&body));
        let conflict_clause = if options.upsert {
            "ON CONFLICT(bucket, key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                cache_control = excluded.cache_control,
                created_at = excluded.created_at"
        } else {
            ""
        };
        let sql = format!(
            "INSERT INTO objects (
                id, bucket, key, content_type, size_bytes, etag, cache_control, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            {}
            RETURNING id, bucket, key, content_type, size_bytes, etag, cache_control, created_at",
            conflict_clause
        );

        let mut tx = self.db.begin().await?;
        let record = sqlx::query_as::<_, ObjectRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(bucket)
            .bind(key)
            .bind(&options.content_type)
            .bind(body.len() as i64)
            .bind(&etag)
            .bind(&options.cache_control)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StorageError::ObjectAlreadyExists {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Sqlx(err)
                }
            })?;

        // An upserted key already has a payload; park it until the row commits.
        let backup = if fs::try_exists(file_path).await? {
            let backup = tmp_path.with_file_name(format!(".bak-{}", Uuid::new_v4()));
            fs::rename(file_path, &backup).await?;
            Some(backup)
        } else {
            None
        };

        if let Err(err) = fs::rename(tmp_path, file_path).await {
            restore_payload(backup.as_deref(), file_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = tx.commit().await {
            restore_payload(backup.as_deref(), file_path).await;
            return Err(StorageError::Sqlx(err));
        }

        if let Some(backup) = backup {
            if let Err(err) = fs::remove_file(&backup).await {
                debug!("could not remove replaced payload {}: {}", backup.display(), err);
            }
        }
        Ok(record)
    }

    /// Fetch a publicly readable object for serving.
    ///
    /// Objects in private buckets are reported as missing. Returns
    /// ObjectNotFound if metadata exists but the physical file is gone.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(ObjectRecord, File)> {
        let object = self.get_object_metadata(bucket, key).await?;

        let file_path = self.object_path(bucket, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    /// Fetch metadata of a publicly readable object.
    pub async fn get_object_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<ObjectRecord> {
        self.ensure_key_safe(key)?;
        if !self.resolve_bucket(bucket)? {
            return Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        self.fetch_object(bucket, key).await
    }
}

#[async_trait]
impl ObjectStorage for StorageService {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        options: &PutOptions,
    ) -> StorageResult<()> {
        let record = self.put_object(bucket, key, body, options).await?;
        info!(
            bucket = %record.bucket,
            key = %record.key,
            size_bytes = record.size_bytes,
            "object stored"
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> Option<String> {
        match self.buckets.get(bucket) {
            Some(true) => Some(format!(
                "{}/storage/{}/{}",
                self.public_base_url, bucket, key
            )),
            _ => None,
        }
    }
}

/// Put the payload that was on disk before a failed write back in place.
/// Without a parked payload the new file is removed instead.
async fn restore_payload(backup: Option<&Path>, file_path: &Path) {
    let outcome = match backup {
        Some(backup) => fs::rename(backup, file_path).await,
        None => match fs::remove_file(file_path).await {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    if let Err(err) = outcome {
        tracing::warn!("could not restore payload {}: {}", file_path.display(), err);
    }
}

/// Validate bucket name format.
///
/// Enforces S3-like naming rules:
/// - 3–63 characters
/// - lowercase letters, digits, dots, hyphens only
/// - cannot start/end with dot or hyphen
/// - cannot contain consecutive dots or dot-hyphen patterns
/// - cannot look like an IPv4 address
fn ensure_bucket_name_safe(name: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let len = name.len();
    if len < BUCKET_NAME_MIN_LEN || len > BUCKET_NAME_MAX_LEN {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, dots, and hyphens",
        ));
    }

    if name.starts_with('.') || name.ends_with('.') || name.starts_with('-') || name.ends_with('-')
    {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }

    if name.contains("..") || name.contains("-.") || name.contains(".-") {
        return Err(invalid(
            "cannot contain consecutive dots or dot-hyphen combinations",
        ));
    }

    if is_ipv4_like(name) {
        return Err(invalid("must not be formatted like an IP address"));
    }

    Ok(())
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts
        .iter()
        .all(|segment| !segment.is_empty() && segment.len() <= 3 && segment.parse::<u8>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_pool,
        services::upload_service::{UploadFile, UploadOptions, UploadService},
    };
    use tokio::io::AsyncReadExt;

    fn put_options(upsert: bool) -> PutOptions {
        PutOptions {
            cache_control: "3600".into(),
            upsert,
            content_type: "image/png".into(),
        }
    }

    async fn service(dir: &Path) -> StorageService {
        StorageService::new(
            Arc::new(test_pool().await),
            dir,
            "http://localhost:3000/",
            [BucketPolicy::public("posters"), BucketPolicy::private("inbox")],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn put_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        let record = storage
            .put_object(
                "posters",
                "uploads/a.png",
                Bytes::from_static(b"png!"),
                &put_options(false),
            )
            .await
            .unwrap();
        assert_eq!(record.size_bytes, 4);
        assert_eq!(record.etag, format!("{:x}", md5::compute(b"png!")));
        assert_eq!(record.cache_control, "3600");

        let (meta, mut file) = storage
            .get_object_reader("posters", "uploads/a.png")
            .await
            .unwrap();
        assert_eq!(meta.content_type, "image/png");
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"png!");
    }

    #[tokio::test]
    async fn existing_key_is_rejected_without_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        storage
            .put_object("posters", "k.png", Bytes::from_static(b"one"), &put_options(false))
            .await
            .unwrap();
        let err = storage
            .put_object("posters", "k.png", Bytes::from_static(b"two"), &put_options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectAlreadyExists { .. }));

        let (_, mut file) = storage.get_object_reader("posters", "k.png").await.unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"one");
    }

    #[tokio::test]
    async fn upsert_replaces_payload_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        storage
            .put_object("posters", "k.png", Bytes::from_static(b"one"), &put_options(false))
            .await
            .unwrap();
        let replaced = storage
            .put_object("posters", "k.png", Bytes::from_static(b"second"), &put_options(true))
            .await
            .unwrap();
        assert_eq!(replaced.size_bytes, 6);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM objects")
            .fetch_one(&*storage.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn rejects_unknown_buckets_and_unsafe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;
        let body = Bytes::from_static(b"x");

        let err = storage
            .put_object("missing", "a", body.clone(), &put_options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BucketNotFound(_)));

        let err = storage
            .put_object("Bad_Bucket", "a", body.clone(), &put_options(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidBucketName { .. }));

        for key in ["", "/abs", "a/../b", "..", "a/./b", "back\\slash"] {
            let err = storage
                .put_object("posters", key, body.clone(), &put_options(false))
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidObjectKey), "{key:?}");
        }
    }

    #[tokio::test]
    async fn private_objects_are_not_served_or_linked() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        storage
            .put_object("inbox", "note.txt", Bytes::from_static(b"hi"), &put_options(false))
            .await
            .unwrap();
        assert_eq!(storage.public_url("inbox", "note.txt"), None);
        let err = storage
            .get_object_metadata("inbox", "note.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn public_url_uses_base_without_double_slash() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        assert_eq!(
            storage.public_url("posters", "uploads/a.png").as_deref(),
            Some("http://localhost:3000/storage/posters/uploads/a.png")
        );
        assert_eq!(storage.public_url("unknown", "a.png"), None);
    }

    #[tokio::test]
    async fn dots_inside_a_segment_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        let key = "uploads/final..v2..cut.png";
        storage
            .put_object("posters", key, Bytes::from_static(b"x"), &put_options(false))
            .await
            .unwrap();
        let meta = storage.get_object_metadata("posters", key).await.unwrap();
        assert_eq!(meta.key, key);
    }

    #[tokio::test]
    async fn upload_service_accepts_repeated_dot_runs() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadService::new(Arc::new(service(dir.path()).await));

        let file = UploadFile {
            name: "final..v2..cut.png".into(),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(b"frame"),
        };
        let stored = uploads
            .upload("posters", file, UploadOptions::default())
            .await
            .unwrap();
        assert!(stored.key.ends_with("-final.v2..cut.png.png"), "{}", stored.key);
        assert!(stored.public_url.is_some());
    }

    #[tokio::test]
    async fn upsert_leaves_only_the_new_payload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = service(dir.path()).await;

        for body in [&b"one"[..], &b"two"[..]] {
            storage
                .put_object("posters", "k.png", Bytes::copy_from_slice(body), &put_options(true))
                .await
                .unwrap();
        }

        let shard_dir = storage.object_path("posters", "k.png");
        let shard_dir = shard_dir.parent().unwrap();
        let mut entries = fs::read_dir(shard_dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["k.png".to_string()]);
        assert_eq!(fs::read(storage.object_path("posters", "k.png")).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn failed_write_restores_parked_payload() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("k.png");
        let parked = dir.path().join(".bak-k");
        fs::write(&target, b"new").await.unwrap();
        fs::write(&parked, b"old").await.unwrap();

        restore_payload(Some(parked.as_path()), &target).await;
        assert_eq!(fs::read(&target).await.unwrap(), b"old");
        assert!(!fs::try_exists(&parked).await.unwrap());

        restore_payload(None, &target).await;
        assert!(!fs::try_exists(&target).await.unwrap());
    }

    #[test]
    fn bucket_name_rules() {
        assert!(ensure_bucket_name_safe("thumbnails").is_ok());
        assert!(ensure_bucket_name_safe("my.bucket-1").is_ok());
        for bad in ["ab", "-abc", "abc.", "a..b", "a.-b", "UPPER", "192.168.0.1"] {
            assert!(ensure_bucket_name_safe(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn invalid_declared_bucket_fails_construction() {
        let result = StorageService::new(
            Arc::new(test_pool().await),
            "/tmp/unused",
            "http://localhost",
            [BucketPolicy::public("no")],
        );
        assert!(matches!(result, Err(StorageError::InvalidBucketName { .. })));
    }
}
