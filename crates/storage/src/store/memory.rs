//! In-memory object store for testing.

use super::{ObjectInfo, ObjectStore};
use crate::backend::BoxAsyncRead;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// In-memory object store for testing.
///
/// Objects live in a [`BTreeMap`] behind a [`RwLock`], so listings come back
/// in the same lexicographic order an S3 bucket would give.
///
/// # Examples
///
/// ```
/// use hepc_storage::store::{MemoryObjectStore, ObjectStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryObjectStore::with_objects([
///     ("dbs/widgets/codeql-database.yml", "primaryLanguage: go\n"),
/// ]);
/// assert_eq!(store.list_keys("dbs/").await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let objects = objects.into_iter().map(|(key, data)| (key.into(), data.into())).collect();
        Self {
            objects: RwLock::new(objects),
        }
    }

    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(key.into(), data.into());
    }

    pub async fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.write().await.remove(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().await;
        Ok(objects.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().await;
        match objects.get(key) {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(PathBuf::from(key))),
        }
    }

    async fn head_object(&self, key: &str) -> Result<Option<ObjectInfo>> {
        let objects = self.objects.read().await;
        Ok(objects.get(key).map(|data| ObjectInfo {
            size: data.len() as u64,
            content_type: None,
        }))
    }

    async fn open_object(&self, key: &str) -> Result<(ObjectInfo, BoxAsyncRead)> {
        let data = self.get_object(key).await?;
        let info = ObjectInfo {
            size: data.len() as u64,
            content_type: None,
        };
        Ok((info, Box::pin(Cursor::new(data))))
    }
}
