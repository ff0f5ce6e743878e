use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::Client;
use tracing::debug;

use super::store::ArtifactStore;
use crate::error::ArtifactError;

/// S3-backed artifact store.
///
/// Existence checks use HEAD requests. Fetched objects are downloaded once
/// into a local cache directory under the bucket name and full object key;
/// later fetches of the same object reuse the cached file.
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    prefix: String,
    cache_dir: PathBuf,
}

impl S3ArtifactStore {
    /// Create a store over `bucket`, with keys under `prefix` (may be empty).
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Directory fetched artifacts are written to.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local path an object is cached at: `cache_dir/bucket/prefix/key`.
    ///
    /// Stores over different buckets or prefixes can share a cache directory.
    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(&self.bucket)
            .join(self.object_key(key))
    }

    fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

/// Write `data` next to `path` and rename it into place.
///
/// An interrupted download leaves only the `.part` file behind, never a
/// truncated file at `path`.
async fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(format!(".{}.part", std::process::id()));
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, data).await?;
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// Whether a HEAD failure means the object does not exist.
fn is_not_found(e: &SdkError<HeadObjectError>) -> bool {
    if e.as_service_error().is_some_and(|se| se.is_not_found()) {
        return true;
    }

    // Some S3-compatible services only report the status code
    if e.raw_response().is_some_and(|r| r.status().as_u16() == 404) {
        return true;
    }

    let err_str = e.to_string();
    err_str.contains("NotFound") || err_str.contains("NoSuchKey") || err_str.contains("404")
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn exists(&self, key: &str) -> Result<bool, ArtifactError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(ArtifactError::S3(e.to_string())),
        }
    }

    async fn fetch(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        let local = self.cache_path(key);
        let io_error = |e: std::io::Error| ArtifactError::Io {
            path: local.display().to_string(),
            message: e.to_string(),
        };

        if tokio::fs::try_exists(&local).await.map_err(io_error)? {
            debug!("Using cached {} for {}", local.display(), self.locate(key));
            return Ok(local);
        }

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    ArtifactError::NotFound(self.locate(key))
                } else {
                    ArtifactError::S3(e.to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| ArtifactError::S3(e.to_string()))?
            .into_bytes();

        write_atomically(&local, &data).await.map_err(io_error)?;

        debug!(
            "Fetched {} ({} bytes) to {}",
            self.locate(key),
            data.len(),
            local.display()
        );
        Ok(local)
    }

    fn locate(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.object_key(key))
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
