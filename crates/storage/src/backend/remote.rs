//! Object-store storage backend.
//!
//! Only unarchived databases are discovered remotely; see
//! [`discovery::remote`](crate::discovery::remote). Every requested name is
//! taken relative to the configured key prefix.

use super::{Fetched, StorageBackend, content_type_for, endpoint_or_default};
use crate::cache::MetadataCache;
use crate::discovery;
use crate::error::{ErrorKind, Result};
use crate::store::ObjectStore;
use async_trait::async_trait;
use hepc_extract::DatabaseMetadata;
use hepc_extract::models::result_url;
use std::sync::Arc;

/// Storage backend over any [`ObjectStore`].
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "s3")]
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use hepc_storage::backend::RemoteBackend;
/// use hepc_storage::store::S3ObjectStore;
/// use std::sync::Arc;
///
/// let store = S3ObjectStore::new("codeql-databases", "us-east-1", None::<String>, "key", "secret");
/// let backend = RemoteBackend::new(Arc::new(store), Some("nightly"), "https://dbs.example.com")?;
/// # Ok(())
/// # }
/// ```
pub struct RemoteBackend {
    store: Arc<dyn ObjectStore>,
    /// Empty, or ending with `/`.
    prefix: String,
    endpoint_url: String,
    cache: MetadataCache,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<&str>, endpoint_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            store,
            prefix: normalize_prefix(prefix.unwrap_or_default()),
            endpoint_url: endpoint_or_default(endpoint_url.into()),
            cache: MetadataCache::default(),
        })
    }

    /// Backend over an S3 (or S3-compatible) bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Configuration`](ErrorKind::Configuration) if the bucket name
    /// is empty.
    #[cfg(feature = "s3")]
    pub fn s3(
        bucket: &str,
        prefix: Option<&str>,
        region: &str,
        endpoint: Option<&str>,
        key_id: &str,
        key_secret: &str,
        endpoint_url: impl Into<String>,
    ) -> Result<Self> {
        if bucket.trim().is_empty() {
            exn::bail!(ErrorKind::Configuration("bucket name is required".to_string()));
        }
        let store = crate::store::S3ObjectStore::new(bucket, region, endpoint, key_id, key_secret);
        tracing::info!(bucket, prefix = prefix.unwrap_or_default(), "Using S3 database bucket");
        Self::new(Arc::new(store), prefix, endpoint_url)
    }

    /// Replace the default catalog cache (e.g. to configure its TTL).
    pub fn with_cache(mut self, cache: MetadataCache) -> Self {
        self.cache = cache;
        self
    }

    fn object_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    async fn scan(&self) -> Result<Vec<DatabaseMetadata>> {
        let databases = discovery::remote::discover(self.store.as_ref(), &self.prefix).await?;
        Ok(databases
            .into_iter()
            .map(|db| {
                let relative = db.location.strip_prefix(&self.prefix).unwrap_or(&db.location);
                let url = result_url(&self.endpoint_url, relative);
                db.into_metadata(url)
            })
            .collect())
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_start_matches('/');
    match prefix.is_empty() || prefix.ends_with('/') {
        true => prefix.to_string(),
        false => format!("{prefix}/"),
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    fn kind(&self) -> &str {
        self.store.kind()
    }

    async fn list_catalog(&self) -> Result<Vec<DatabaseMetadata>> {
        self.cache.get_or_refresh(|| self.scan()).await
    }

    async fn fetch(&self, name: &str) -> Result<Fetched> {
        let key = self.object_key(name);
        let (info, reader) = self.store.open_object(&key).await?;
        let content_type = info.content_type.unwrap_or_else(|| content_type_for(name).to_string());
        tracing::debug!(key, size = info.size, "Serving remote object");
        Ok(Fetched { reader, size: info.size, content_type })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.store.head_object(&self.object_key(name)).await?.is_some())
    }

    async fn invalidate_catalog(&self) {
        self.cache.invalidate().await;
    }

    async fn close(&self) -> Result<()> {
        self.cache.clear().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryObjectStore;
    use rstest::rstest;
    use tokio::io::AsyncReadExt;

    const WIDGETS_YAML: &str = "sourceLocationPrefix: /home/x/src/acme/widgets\nprimaryLanguage: go\n";

    fn backend(objects: &[(&str, &str)], prefix: Option<&str>) -> RemoteBackend {
        let store = MemoryObjectStore::with_objects(objects.iter().map(|(k, v)| (*k, *v)));
        RemoteBackend::new(Arc::new(store), prefix, "https://dbs.example.com").unwrap()
    }

    #[rstest]
    #[case("", "")]
    #[case("a", "a/")]
    #[case("a/", "a/")]
    #[case("/a/b", "a/b/")]
    fn test_normalize_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_prefix(input), expected);
    }

    #[tokio::test]
    async fn test_catalog_only_covers_configured_prefix() {
        let backend = backend(
            &[("a/db1/codeql-database.yml", WIDGETS_YAML), ("b/db2/codeql-database.yml", WIDGETS_YAML)],
            Some("a"),
        );
        let catalog = backend.list_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].result_url, "https://dbs.example.com/db/db1");
        assert_eq!(catalog[0].db_file_size_bytes, 0);
        assert_eq!(catalog[0].tool_name, "codeql-go");
    }

    #[tokio::test]
    async fn test_descriptor_at_prefix_root_is_ignored() {
        let backend = backend(
            &[("dbs/codeql-database.yml", WIDGETS_YAML), ("dbs/widgets/codeql-database.yml", WIDGETS_YAML)],
            Some("dbs"),
        );
        let urls: Vec<_> = backend.list_catalog().await.unwrap().into_iter().map(|m| m.result_url).collect();
        assert_eq!(urls, vec!["https://dbs.example.com/db/widgets"]);
    }

    #[tokio::test]
    async fn test_catalog_is_cached_until_invalidated() {
        let store = Arc::new(MemoryObjectStore::with_objects([("x/db1/codeql-database.yml", WIDGETS_YAML)]));
        let backend = RemoteBackend::new(store.clone(), Some("x"), "").unwrap();
        assert_eq!(backend.list_catalog().await.unwrap().len(), 1);

        store.insert("x/db2/codeql-database.yml", WIDGETS_YAML).await;
        assert_eq!(backend.list_catalog().await.unwrap().len(), 1);

        backend.invalidate_catalog().await;
        assert_eq!(backend.list_catalog().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_prepends_prefix() {
        let backend = backend(&[("dbs/acme/widgets.zip", "PK..."), ("acme/widgets.zip", "wrong")], Some("dbs"));
        let mut fetched = backend.fetch("acme/widgets.zip").await.unwrap();
        assert_eq!(fetched.size, 5);
        assert_eq!(fetched.content_type, "application/zip");
        let mut body = String::new();
        fetched.reader.read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "PK...");
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let backend = backend(&[], None);
        let err = backend.fetch("nope.zip").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let backend = backend(&[("dbs/one.zip", "1")], Some("dbs/"));
        assert!(backend.exists("one.zip").await.unwrap());
        assert!(!backend.exists("two.zip").await.unwrap());
    }

    #[tokio::test]
    async fn test_kind() {
        let backend = backend(&[], None);
        assert_eq!(backend.kind(), "memory");
        assert!(backend.catalog_available().await.unwrap());
        backend.close().await.unwrap();
    }
}
