//! Discovery over a directory tree.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hepc_extract::consts::{ARCHIVE_EXTENSION, STRUCTURED_DESCRIPTOR};
use hepc_extract::{Descriptor, DiscoveredDatabase, extract_archive, language};
use std::collections::HashSet;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tracing::instrument;

/// What to do with a single directory entry.
enum Visit {
    /// A database; nothing beneath it is visited.
    Container(DiscoveredDatabase),
    Descend(PathBuf),
    Skip,
}

/// Walk `root` and return every database found beneath it.
///
/// Directories holding a structured descriptor are unarchived databases and
/// are not descended into, so nested containers are never reported. Files
/// ending in `.zip` (any case) are inspected as archived databases; ones that
/// turn out not to be databases are skipped.
///
/// # Errors
///
/// [`CatalogUnavailable`](ErrorKind::CatalogUnavailable) if `root` itself
/// can't be read. Anything that goes wrong further down is logged and skipped.
#[instrument(skip(root), fields(root = %root.display()))]
pub async fn discover(root: &Path) -> Result<Vec<DiscoveredDatabase>> {
    let mut databases = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root.to_path_buf()];

    'dirs: while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(err) if current == root => {
                return Err(err).or_raise(|| ErrorKind::CatalogUnavailable(root.display().to_string()));
            },
            Err(err) => {
                tracing::warn!(path = %current.display(), error = %err, "Skipping unreadable directory");
                continue 'dirs;
            },
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(path = %current.display(), error = %err, "Failed reading directory entry");
                    continue 'dirs;
                },
            };
            match visit(entry).await {
                Visit::Container(db) => {
                    if seen.insert(db.location.clone()) {
                        tracing::debug!(location = %db.location, language = %db.language, "Found database");
                        databases.push(db);
                    }
                },
                Visit::Descend(path) => stack.push(path),
                Visit::Skip => {},
            }
        }
    }

    tracing::info!(count = databases.len(), "Local discovery finished");
    Ok(databases)
}

async fn visit(entry: DirEntry) -> Visit {
    let path = entry.path();
    let file_type = match entry.file_type().await {
        Ok(file_type) => file_type,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping entry of unknown type");
            return Visit::Skip;
        },
    };

    if file_type.is_dir() {
        if !matches!(fs::try_exists(path.join(STRUCTURED_DESCRIPTOR)).await, Ok(true)) {
            return Visit::Descend(path);
        }
        return match extract_unarchived(&path).await {
            Ok(db) => Visit::Container(db),
            Err(err) => {
                // Still worth looking inside: the descriptor may belong to a
                // broken wrapper around real databases.
                tracing::warn!(path = %path.display(), error = ?err, "Failed to extract unarchived database");
                Visit::Descend(path)
            },
        };
    }

    if file_type.is_file() && has_archive_extension(&path) {
        return match extract_archived(path.clone()).await {
            Ok(db) => Visit::Container(db),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = ?err, "Skipping archive");
                Visit::Skip
            },
        };
    }

    // Note: symlinks are never followed.
    Visit::Skip
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn location(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Extract metadata from a directory holding a structured descriptor.
pub async fn extract_unarchived(dir: &Path) -> Result<DiscoveredDatabase> {
    let descriptor_path = dir.join(STRUCTURED_DESCRIPTOR);
    let bytes = fs::read(&descriptor_path)
        .await
        .map_err(|e| ErrorKind::from_io(e, &descriptor_path))?;
    let descriptor = Descriptor::parse_structured(&bytes).or_raise(|| ErrorKind::ParseSkipped(location(dir)))?;
    let size = directory_size(dir).await?;
    let language = match &descriptor.primary_language {
        Some(language) => language.clone(),
        None => language::infer(subdirectory_names(dir).await),
    };
    Ok(DiscoveredDatabase::unarchived(location(dir), descriptor, language, size))
}

/// Inspect a zip archive on a blocking thread.
pub async fn extract_archived(path: PathBuf) -> Result<DiscoveredDatabase> {
    let archive = location(&path);
    let task = tokio::task::spawn_blocking(move || -> Result<DiscoveredDatabase> {
        let file = std::fs::File::open(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        let size = file.metadata().map_err(ErrorKind::Io)?.len();
        let location = location(&path);
        extract_archive(BufReader::new(file), &location, size).or_raise(|| ErrorKind::ParseSkipped(location.clone()))
    });
    task.await.or_raise(|| ErrorKind::ParseSkipped(archive.clone()))?
}

/// Sum of the sizes of every regular file beneath `dir`.
async fn directory_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current).await.map_err(|e| ErrorKind::from_io(e, &current))?;
        while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
            let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, entry.path()))?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else if metadata.is_file() {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}

/// Names of the immediate subdirectories of `dir`, for language inference.
/// Empty when `dir` can't be read.
async fn subdirectory_names(dir: &Path) -> Vec<String> {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return Vec::new();
    };
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    pub(crate) fn write_unarchived(dir: &Path, yaml: &str) {
        std::fs::create_dir_all(dir.join("db-go/default")).unwrap();
        std::fs::write(dir.join(STRUCTURED_DESCRIPTOR), yaml).unwrap();
        std::fs::write(dir.join("db-go/default/strings.rel"), vec![0u8; 128]).unwrap();
    }

    pub(crate) fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, contents) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    const WIDGETS_YAML: &str = "sourceLocationPrefix: /home/runner/work/acme/widgets\nprimaryLanguage: go\n";
    const LEGACY_DBINFO: &str = "<dbinfo><sourceLocationPrefix>/opt/src</sourceLocationPrefix></dbinfo>";

    #[tokio::test]
    async fn test_unarchived_database() {
        let root = tempdir().unwrap();
        let db_dir = root.path().join("widgets-db");
        write_unarchived(&db_dir, WIDGETS_YAML);

        let databases = discover(root.path()).await.unwrap();
        assert_eq!(databases.len(), 1);
        let db = &databases[0];
        assert!(!db.is_archived);
        assert_eq!(db.display_name, "widgets-db");
        assert_eq!((db.owner.as_str(), db.repo.as_str()), ("acme", "widgets"));
        assert_eq!(db.language, "go");
        let expected_size = (WIDGETS_YAML.len() + 128) as u64;
        assert_eq!(db.file_size_bytes, expected_size);
    }

    #[tokio::test]
    async fn test_language_inferred_from_directories() {
        let root = tempdir().unwrap();
        write_unarchived(&root.path().join("db"), "sourceLocationPrefix: /src/acme/widgets\n");
        let databases = discover(root.path()).await.unwrap();
        assert_eq!(databases[0].language, "go");
    }

    #[tokio::test]
    async fn test_legacy_archive_uses_file_name() {
        let root = tempdir().unwrap();
        let archive = root.path().join("u-boot_u-boot_cpp.zip");
        write_zip(&archive, &[("cpp-db/.dbinfo", LEGACY_DBINFO), ("cpp-db/db-cpp/x", "")]);

        let databases = discover(root.path()).await.unwrap();
        assert_eq!(databases.len(), 1);
        let db = &databases[0];
        assert!(db.is_archived);
        assert_eq!((db.owner.as_str(), db.repo.as_str()), ("u-boot", "u-boot"));
        assert_eq!(db.language, "cpp");
        assert_eq!(db.file_size_bytes, std::fs::metadata(&archive).unwrap().len());
        assert_eq!(db.content_hash, hepc_extract::hash::content_hash_bytes(std::fs::read(&archive).unwrap()));
    }

    #[tokio::test]
    async fn test_archive_extension_is_case_insensitive() {
        let root = tempdir().unwrap();
        write_zip(&root.path().join("acme_widgets.ZIP"), &[("db/codeql-database.yml", WIDGETS_YAML)]);
        assert_eq!(discover(root.path()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_database_zip_is_skipped() {
        let root = tempdir().unwrap();
        write_zip(&root.path().join("photos.zip"), &[("a.jpg", "jpeg")]);
        std::fs::write(root.path().join("broken.zip"), b"not a zip").unwrap();
        std::fs::write(root.path().join("README.md"), b"# dbs").unwrap();
        assert!(discover(root.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nested_containers_are_pruned() {
        let root = tempdir().unwrap();
        let outer = root.path().join("outer");
        write_unarchived(&outer, WIDGETS_YAML);
        write_unarchived(&outer.join("inner"), WIDGETS_YAML);
        write_zip(&outer.join("nested.zip"), &[("db/codeql-database.yml", WIDGETS_YAML)]);

        let databases = discover(root.path()).await.unwrap();
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].display_name, "outer");
    }

    #[tokio::test]
    async fn test_databases_in_subdirectories() {
        let root = tempdir().unwrap();
        write_unarchived(&root.path().join("team-a/widgets"), WIDGETS_YAML);
        std::fs::create_dir_all(root.path().join("team-b")).unwrap();
        write_zip(&root.path().join("team-b/acme_gadgets.zip"), &[("db/codeql-database.yml", WIDGETS_YAML)]);

        let mut names: Vec<_> = discover(root.path()).await.unwrap().into_iter().map(|d| d.display_name).collect();
        names.sort();
        assert_eq!(names, vec!["acme_gadgets.zip", "widgets"]);
    }

    #[tokio::test]
    async fn test_malformed_descriptor_directory_is_descended() {
        let root = tempdir().unwrap();
        let wrapper = root.path().join("wrapper");
        std::fs::create_dir_all(&wrapper).unwrap();
        std::fs::write(wrapper.join(STRUCTURED_DESCRIPTOR), "primaryLanguage: [oops").unwrap();
        write_unarchived(&wrapper.join("real"), WIDGETS_YAML);

        let databases = discover(root.path()).await.unwrap();
        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0].display_name, "real");
    }

    #[tokio::test]
    async fn test_subdirectory_names() {
        let root = tempdir().unwrap();
        write_unarchived(root.path(), WIDGETS_YAML);
        assert_eq!(subdirectory_names(root.path()).await, vec!["db-go"]);

        let missing = subdirectory_names(&root.path().join("missing")).await;
        assert!(missing.is_empty());
        assert_eq!(language::infer(missing), "unknown");
    }

    #[tokio::test]
    async fn test_missing_root_is_unavailable() {
        let root = tempdir().unwrap();
        let err = discover(&root.path().join("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_root() {
        let root = tempdir().unwrap();
        assert!(discover(root.path()).await.unwrap().is_empty());
    }
}
