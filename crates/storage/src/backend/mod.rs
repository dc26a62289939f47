//! Storage backend trait and implementations.
//!
//! A backend owns a namespace (a directory tree or an object-store prefix),
//! discovers the databases in it, caches the resulting catalog, and serves
//! the raw files behind each catalog entry.

mod local;
mod remote;

pub use self::local::LocalBackend;
pub use self::remote::RemoteBackend;
use crate::error::Result;
use async_trait::async_trait;
use hepc_extract::DatabaseMetadata;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Endpoint used to build result URLs when none is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8070";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub type BoxAsyncRead = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// A file opened for streaming.
///
/// Dropping `reader` early aborts the underlying read; for remote backends
/// that includes the in-flight request.
pub struct Fetched {
    pub reader: BoxAsyncRead,
    pub size: u64,
    pub content_type: String,
}

impl std::fmt::Debug for Fetched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetched")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Unified interface for storage backends.
///
/// Which implementation is in use is decided once, from configuration, and
/// everything downstream only ever sees a
/// [`BackendHandle`](crate::BackendHandle).
///
/// # Path Handling
/// Names passed to [`fetch()`](Self::fetch) and [`exists()`](Self::exists)
/// are relative to the backend's namespace root. Implementations must never
/// serve anything outside of that root.
///
/// # Examples
///
/// ```
/// use hepc_storage::{backend::StorageBackend, error::Result};
///
/// async fn projects(backend: &dyn StorageBackend) -> Result<Vec<String>> {
///     let catalog = backend.list_catalog().await?;
///     Ok(catalog.into_iter().map(|db| db.project_name).collect())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stable identifier of the backend type (`"local"`, `"s3"`, ...).
    fn kind(&self) -> &str;

    /// Every database in the namespace, served from the cache while it is
    /// fresh.
    ///
    /// Returns [`CatalogUnavailable`](crate::error::ErrorKind::CatalogUnavailable)
    /// if the namespace can't be enumerated. Databases that can't be read are
    /// left out rather than failing the listing.
    async fn list_catalog(&self) -> Result<Vec<DatabaseMetadata>>;

    /// Open a file for streaming.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn fetch(&self, name: &str) -> Result<Fetched>;

    /// Check if a file exists.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Whether a catalog can be produced at all.
    ///
    /// Catalogs are always built by discovery, so by default this is always
    /// `true`.
    async fn catalog_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Force the next [`list_catalog()`](Self::list_catalog) to rescan.
    async fn invalidate_catalog(&self);

    /// Release held resources. The backend shouldn't be used afterwards.
    async fn close(&self) -> Result<()>;
}

/// Guess a content type from a file name's extension.
///
/// ```
/// use hepc_storage::backend::content_type_for;
/// assert_eq!(content_type_for("acme/widgets.ZIP"), "application/zip");
/// assert_eq!(content_type_for("db/codeql-database.yml"), "application/yaml");
/// assert_eq!(content_type_for("db/db-go/default/strings"), "application/octet-stream");
/// ```
pub fn content_type_for(name: impl AsRef<Path>) -> &'static str {
    let Some(extension) = name.as_ref().extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    match extension.to_ascii_lowercase().as_str() {
        "zip" => "application/zip",
        "json" => "application/json",
        "yml" | "yaml" => "application/yaml",
        "xml" => "application/xml",
        "txt" => "text/plain",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Use the configured endpoint, or the default when it's blank.
fn endpoint_or_default(endpoint_url: String) -> String {
    match endpoint_url.trim() {
        "" => DEFAULT_ENDPOINT_URL.to_string(),
        _ => endpoint_url,
    }
}
