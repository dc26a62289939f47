//! S3-compatible object store.
//!
//! Works with AWS S3 as well as S3-compatible services (Backblaze B2, Tigris,
//! MinIO, ...).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.
//!
//! TODO: support `credentials: "profile:name"` in config to use the AWS SDK
//! credential provider chain for actual AWS S3 buckets.

use super::{ObjectInfo, ObjectStore};
use crate::backend::BoxAsyncRead;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, retry::RetryConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use exn::ResultExt;
use std::path::PathBuf;

/// S3-compatible object store scoped to a single bucket.
///
/// # Examples
///
/// ```no_run
/// use hepc_storage::store::S3ObjectStore;
///
/// let store = S3ObjectStore::new(
///     "codeql-databases",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(key_id, key_secret, None, None, "hepc-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Failures surface to the caller; nothing is retried.
            .retry_config(RetryConfig::disabled())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self::from_client(Client::from_conf(config_builder.build()), bucket)
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn network_error(err: impl std::error::Error) -> ErrorKind {
    ErrorKind::Network(DisplayErrorContext(err).to_string())
}

fn object_info(size: Option<i64>, content_type: Option<&str>) -> ObjectInfo {
    ObjectInfo {
        size: size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
        content_type: content_type.filter(|t| !t.is_empty()).map(str::to_string),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn kind(&self) -> &'static str {
        "s3"
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();
        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(network_error)?;
            keys.extend(page.contents().iter().filter_map(|object| object.key().map(str::to_string)));
        }
        tracing::debug!(count = keys.len(), "Listed objects");
        Ok(keys)
    }

    async fn first_key(&self, prefix: &str) -> Result<Option<String>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(network_error)?;
        Ok(output.contents().first().and_then(|object| object.key()).map(str::to_string))
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let (_, mut body) = self.open_object(key).await?;
        let mut data = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut body, &mut data)
            .await
            .or_raise(|| ErrorKind::Network(format!("failed reading object body: {key}")))?;
        Ok(data)
    }

    async fn head_object(&self, key: &str) -> Result<Option<ObjectInfo>> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => Ok(Some(object_info(output.content_length(), output.content_type()))),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => exn::bail!(network_error(err)),
        }
    }

    async fn open_object(&self, key: &str) -> Result<(ObjectInfo, BoxAsyncRead)> {
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(PathBuf::from(key)))
            },
            Err(err) => exn::bail!(network_error(err)),
        };
        let info = object_info(output.content_length(), output.content_type());
        Ok((info, Box::pin(output.body.into_async_read())))
    }
}
