//! Flat key/value object stores.
//!
//! The remote backend only needs four things from an object store, so that is
//! all [`ObjectStore`] asks for. Keys are plain strings; "directories" are
//! nothing more than shared key prefixes.

#[cfg(any(test, feature = "mock"))]
mod memory;
#[cfg(feature = "s3")]
mod s3;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryObjectStore;
#[cfg(feature = "s3")]
pub use self::s3::S3ObjectStore;
use crate::backend::BoxAsyncRead;
use crate::error::Result;
use async_trait::async_trait;

/// Attributes of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    /// Content type recorded by the store, if any.
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name of the store type, reported by the owning backend.
    fn kind(&self) -> &'static str;

    /// Every key beginning with `prefix`, in lexicographic order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// The first key beginning with `prefix`, if there is one.
    ///
    /// Default implementation lists everything and keeps the first; stores
    /// that can limit a listing should override it.
    async fn first_key(&self, prefix: &str) -> Result<Option<String>> {
        Ok(self.list_keys(prefix).await?.into_iter().next())
    }

    /// Read a whole object into memory. Only used for small objects such as
    /// descriptors.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if there's no
    /// such key.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    /// Attributes of an object, or `None` if there's no such key.
    async fn head_object(&self, key: &str) -> Result<Option<ObjectInfo>>;

    /// Open an object for streaming.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if there's no
    /// such key.
    async fn open_object(&self, key: &str) -> Result<(ObjectInfo, BoxAsyncRead)>;
}
