use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use s3::types::{Delete, ObjectIdentifier};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::ApiError;

/// StoredAsset
///
/// The result of hosting an image: a public URL for clients plus the opaque
/// key needed to release the asset later.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub url: String,
    pub key: String,
}

/// AssetHost
///
/// The abstract contract for the external image host. Handlers and the
/// cascade coordinator depend on this trait so the concrete S3 client can be
/// swapped for the in-memory mock in tests.
///
/// `release` of an already-released key must be a no-op — cascade retries
/// depend on it.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Ensures the configured bucket exists. Used in the local setup to
    /// provision the bucket in MinIO. Idempotent.
    async fn ensure_bucket_exists(&self);

    /// Uploads image bytes under the given key and returns the public URL
    /// plus the key for later release.
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, ApiError>;

    /// Deletes a hosted asset. No-op if the key no longer exists.
    async fn release(&self, key: &str) -> Result<(), ApiError>;

    /// Batch variant of `release`.
    async fn release_many(&self, keys: &[String]) -> Result<(), ApiError>;
}

/// StorageState
///
/// The concrete type used to share the asset host across the application
/// state.
pub type StorageState = Arc<dyn AssetHost>;

/// Builds a collision-free object key under a prefix, preserving the original
/// file extension ("posts/UUID.jpg").
pub fn make_asset_key(prefix: &str, filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    format!("{}/{}.{}", prefix, Uuid::new_v4(), extension)
}

/// Removes directory navigation components from a user-influenced key
/// segment so a crafted filename cannot escape the upload prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// S3AssetHost
///
/// The concrete implementation using the AWS SDK for S3. S3 compatibility
/// lets this client talk to a Dockerized MinIO instance locally and a hosted
/// gateway in production; `force_path_style(true)` is required for both.
#[derive(Clone)]
pub struct S3AssetHost {
    client: s3::Client,
    bucket_name: String,
    endpoint: String,
}

impl S3AssetHost {
    /// Constructs the S3 client from credentials and configuration resolved
    /// by AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // for MinIO and S3-compatible gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetHost for S3AssetHost {
    /// Calls the S3 CreateBucket API. The API is idempotent, so this is safe
    /// to call at every startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, ApiError> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ApiError::ExternalService(format!("asset upload failed: {e}")))?;

        Ok(StoredAsset {
            url: format!("{}/{}/{}", self.endpoint, self.bucket_name, key),
            key,
        })
    }

    async fn release(&self, key: &str) -> Result<(), ApiError> {
        // DeleteObject succeeds for keys that no longer exist, which gives
        // the double-release no-op the cascade retries rely on.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| ApiError::ExternalService(format!("asset release failed: {e}")))?;
        Ok(())
    }

    async fn release_many(&self, keys: &[String]) -> Result<(), ApiError> {
        if keys.is_empty() {
            return Ok(());
        }
        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| ApiError::ExternalService(format!("bad asset key: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| ApiError::ExternalService(format!("bad delete batch: {e}")))?;
        self.client
            .delete_objects()
            .bucket(&self.bucket_name)
            .delete(delete)
            .send()
            .await
            .map_err(|e| ApiError::ExternalService(format!("asset batch release failed: {e}")))?;
        Ok(())
    }
}

/// MockAssetHost
///
/// In-memory implementation used by unit and integration tests. Records every
/// stored and released key so cascade tests can assert which assets were
/// cleaned up, and can simulate an asset-host outage via `should_fail`.
#[derive(Clone, Default)]
pub struct MockAssetHost {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    pub stored: Arc<Mutex<Vec<String>>>,
    pub released: Arc<Mutex<Vec<String>>>,
}

impl MockAssetHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn released_keys(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetHost for MockAssetHost {
    async fn ensure_bucket_exists(&self) {}

    async fn store(
        &self,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredAsset, ApiError> {
        if self.should_fail {
            return Err(ApiError::ExternalService(
                "mock asset host failure".to_string(),
            ));
        }
        let key = sanitize_key(key);
        self.stored.lock().unwrap().push(key.clone());
        Ok(StoredAsset {
            url: format!("http://localhost:9000/mock-bucket/{key}"),
            key,
        })
    }

    async fn release(&self, key: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::ExternalService(
                "mock asset host failure".to_string(),
            ));
        }
        self.released.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn release_many(&self, keys: &[String]) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::ExternalService(
                "mock asset host failure".to_string(),
            ));
        }
        self.released.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }
}
