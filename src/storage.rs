use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::Arc;
use thiserror::Error;

/// StorageError
///
/// Failure surface of the blob store. The content stores never see this;
/// only the upload handler does.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
}

/// ImageStorage
///
/// The abstract contract for the blob store holding raw image bytes. The
/// rest of the application only ever handles image metadata; bytes enter and
/// leave through this trait. Implementations: the real S3 client and an
/// in-memory mock for tests.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup
    /// to provision the bucket in MinIO automatically. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Stores an object and returns the public URL it is served from.
    ///
    /// # Arguments
    /// * `key`: the object key (path + filename) in the bucket.
    /// * `content_type`: the MIME type recorded on the object.
    async fn store_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;
}

/// StorageState
///
/// The shared handle to the blob store.
pub type StorageState = Arc<dyn ImageStorage>;

/// S3ImageStorage
///
/// The concrete implementation using the AWS SDK for S3. S3 compatibility
/// covers the Dockerized MinIO instance locally and any S3-compatible
/// provider in production. `force_path_style(true)` is required for MinIO
/// style gateways.
#[derive(Clone)]
pub struct S3ImageStorage {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3ImageStorage {
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
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ImageStorage for S3ImageStorage {
    /// Calls the S3 CreateBucket API. The call is idempotent, so this is safe
    /// on every startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn store_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        // Path-style object URL, matching force_path_style above.
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket_name, key))
    }
}

/// Strips directory navigation components from a user-influenced key segment.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockImageStorage
///
/// An `ImageStorage` used by the test suite: no network, deterministic URLs,
/// optional simulated failure.
#[derive(Clone)]
pub struct MockImageStorage {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockImageStorage {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockImageStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStorage for MockImageStorage {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn store_image(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Upload("simulated storage failure".to_string()));
        }

        let sanitized_key = sanitize_key(key);
        Ok(format!("http://localhost:9000/mock-bucket/{}", sanitized_key))
    }
}
