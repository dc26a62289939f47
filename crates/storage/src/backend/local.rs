//! Local filesystem storage backend.
//!
//! Databases live somewhere beneath a configured root directory, either as
//! zip archives or as unarchived directory trees. Files are accessed using
//! `tokio::fs` for async I/O.

use super::{Fetched, StorageBackend, content_type_for, endpoint_or_default};
use crate::cache::MetadataCache;
use crate::discovery;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use hepc_extract::DatabaseMetadata;
use hepc_extract::models::result_url;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use hepc_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("/srv/codeql-dbs", "https://dbs.example.com")?;
/// # Ok(())
/// # }
/// ```
pub struct LocalBackend {
    /// Canonical root directory of the namespace.
    root: PathBuf,
    endpoint_url: String,
    cache: MetadataCache,
}

impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns [`Configuration`](ErrorKind::Configuration) if `root` is not an
    /// existing directory.
    pub fn new(root: impl AsRef<Path>, endpoint_url: impl Into<String>) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Configuration("database directory is required".to_string()));
        }
        // Use non-async here; it'll only happen once on startup and it's not
        // worth the hassle of making the constructor async.
        let root = match root.canonicalize() {
            Ok(canonical) if canonical.is_dir() => canonical,
            Ok(_) => exn::bail!(ErrorKind::Configuration(format!("not a directory: {}", root.display()))),
            Err(err) => exn::bail!(ErrorKind::Configuration(format!(
                "database directory {} is unusable: {err}",
                root.display()
            ))),
        };
        tracing::info!(root = %root.display(), "Using local database directory");
        Ok(Self {
            root,
            endpoint_url: endpoint_or_default(endpoint_url.into()),
            cache: MetadataCache::default(),
        })
    }

    /// Replace the default catalog cache (e.g. to configure its TTL).
    pub fn with_cache(mut self, cache: MetadataCache) -> Self {
        self.cache = cache;
        self
    }

    /// Resolve a requested name to an absolute path that is guaranteed to sit
    /// beneath the root.
    ///
    /// Lexical validation catches `..` escapes; canonicalizing catches
    /// symlinks that point elsewhere. Paths that don't exist yet are returned
    /// as-is so the caller can report them as missing.
    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let absolute = self.root.join(validate_path(name)?);
        match fs::canonicalize(&absolute).await {
            Ok(canonical) if canonical.starts_with(&self.root) => Ok(canonical),
            Ok(canonical) => {
                tracing::warn!(name, resolved = %canonical.display(), "Refusing path outside of root");
                exn::bail!(ErrorKind::AccessDenied(PathBuf::from(name)))
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(absolute),
            Err(err) => exn::bail!(ErrorKind::from_io(err, name)),
        }
    }

    /// Location relative to the root, with `/` separators, for result URLs.
    fn relative_location(&self, location: &str) -> String {
        let relative = Path::new(location).strip_prefix(&self.root).unwrap_or(Path::new(location));
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn scan(&self) -> Result<Vec<DatabaseMetadata>> {
        let databases = discovery::local::discover(&self.root).await?;
        Ok(databases
            .into_iter()
            .map(|db| {
                let url = result_url(&self.endpoint_url, &self.relative_location(&db.location));
                db.into_metadata(url)
            })
            .collect())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> &str {
        "local"
    }

    async fn list_catalog(&self) -> Result<Vec<DatabaseMetadata>> {
        self.cache.get_or_refresh(|| self.scan()).await
    }

    async fn fetch(&self, name: &str) -> Result<Fetched> {
        let path = self.resolve(name).await?;
        let metadata = fs::metadata(&path).await.map_err(|e| ErrorKind::from_io(e, name))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotAFile(PathBuf::from(name)));
        }
        let file = fs::File::open(&path).await.map_err(|e| ErrorKind::from_io(e, name))?;
        tracing::debug!(name, size = metadata.len(), "Serving local file");
        Ok(Fetched {
            reader: Box::pin(file),
            size: metadata.len(),
            content_type: content_type_for(&path).to_string(),
        })
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = match self.resolve(name).await {
            Ok(path) => path,
            Err(err) if matches!(&*err, ErrorKind::NotAFile(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => exn::bail!(ErrorKind::from_io(err, name)),
        }
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
    use crate::discovery::local::tests::{write_unarchived, write_zip};
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    const WIDGETS_YAML: &str = "sourceLocationPrefix: /home/x/src/acme/widgets\nprimaryLanguage: go\n";

    fn backend(root: &Path) -> LocalBackend {
        LocalBackend::new(root, "http://localhost:8070/").unwrap()
    }

    #[tokio::test]
    async fn test_catalog_for_unarchived_database() {
        let root = tempdir().unwrap();
        write_unarchived(&root.path().join("repo-db"), WIDGETS_YAML);

        let catalog = backend(root.path()).list_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        let db = &catalog[0];
        assert_eq!(db.git_owner, "acme");
        assert_eq!(db.git_repo, "widgets");
        assert_eq!(db.primary_language, "go");
        assert_eq!(db.tool_name, "codeql-go");
        assert_eq!(db.project_name, "acme/widgets");
        assert_eq!(db.result_url, "http://localhost:8070/db/repo-db");
    }

    #[tokio::test]
    async fn test_catalog_for_legacy_archive() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("embedded")).unwrap();
        write_zip(
            &root.path().join("embedded/u-boot_u-boot_cpp.zip"),
            &[("cpp/.dbinfo", "<dbinfo><sourceLocationPrefix>/opt/src</sourceLocationPrefix></dbinfo>")],
        );

        let catalog = backend(root.path()).list_catalog().await.unwrap();
        assert_eq!(catalog.len(), 1);
        let db = &catalog[0];
        assert_eq!((db.git_owner.as_str(), db.git_repo.as_str()), ("u-boot", "u-boot"));
        assert_eq!(db.git_commit_id, "");
        assert_eq!(db.tool_name, "codeql");
        assert_eq!(db.build_cid, &db.content_hash[..10]);
        assert_eq!(db.result_url, "http://localhost:8070/db/embedded/u-boot_u-boot_cpp.zip");
    }

    #[tokio::test]
    async fn test_catalog_is_cached_until_invalidated() {
        let root = tempdir().unwrap();
        write_unarchived(&root.path().join("first"), WIDGETS_YAML);
        let backend = backend(root.path());
        assert_eq!(backend.list_catalog().await.unwrap().len(), 1);

        write_unarchived(&root.path().join("second"), WIDGETS_YAML);
        assert_eq!(backend.list_catalog().await.unwrap().len(), 1);

        backend.invalidate_catalog().await;
        assert_eq!(backend.list_catalog().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_streams_file() {
        let root = tempdir().unwrap();
        write_zip(&root.path().join("acme_widgets.zip"), &[("db/codeql-database.yml", WIDGETS_YAML)]);
        let expected = std::fs::read(root.path().join("acme_widgets.zip")).unwrap();

        let mut fetched = backend(root.path()).fetch("acme_widgets.zip").await.unwrap();
        assert_eq!(fetched.size, expected.len() as u64);
        assert_eq!(fetched.content_type, "application/zip");
        let mut body = Vec::new();
        fetched.reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_fetch_traversal_is_denied() {
        let root = tempdir().unwrap();
        let backend = backend(root.path());
        let err = backend.fetch("../../etc/passwd").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AccessDenied(_)));
        let err = backend.exists("../../etc/passwd").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AccessDenied(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_symlink_escape_is_denied() {
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        let root = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.path().join("link.txt")).unwrap();

        let err = backend(root.path()).fetch("link.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_fetch_missing_and_directories() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dir")).unwrap();
        let backend = backend(root.path());

        let err = backend.fetch("missing.zip").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.fetch("dir").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAFile(_)));
        let err = backend.fetch("").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAFile(_)));
    }

    #[tokio::test]
    async fn test_exists() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("dir")).unwrap();
        std::fs::write(root.path().join("dir/file.txt"), b"x").unwrap();
        let backend = backend(root.path());

        assert!(backend.exists("dir/file.txt").await.unwrap());
        assert!(!backend.exists("dir").await.unwrap());
        assert!(!backend.exists("dir/missing.txt").await.unwrap());
        assert!(!backend.exists("").await.unwrap());
    }

    #[test]
    fn test_new_requires_existing_directory() {
        let root = tempdir().unwrap();
        let err = LocalBackend::new(root.path().join("missing"), "").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));

        std::fs::write(root.path().join("file"), b"x").unwrap();
        let err = LocalBackend::new(root.path().join("file"), "").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));

        let err = LocalBackend::new("", "").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));
    }

    #[tokio::test]
    async fn test_missing_root_after_start_is_unavailable() {
        let root = tempdir().unwrap();
        let inner = root.path().join("dbs");
        std::fs::create_dir_all(&inner).unwrap();
        let backend = backend(&inner);
        std::fs::remove_dir(&inner).unwrap();

        let err = backend.list_catalog().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_kind_and_availability() {
        let root = tempdir().unwrap();
        let backend = backend(root.path());
        assert_eq!(backend.kind(), "local");
        assert!(backend.catalog_available().await.unwrap());
        backend.close().await.unwrap();
    }
}
