use super::DatabaseMetadata;
use crate::consts::UNKNOWN;
use crate::descriptor::{CreationMetadata, Descriptor};
use crate::hash;
use crate::ownership;

/// A database container located during a scan.
///
/// Only lives for the duration of a scan: it is converted straight into a
/// [`DatabaseMetadata`] catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDatabase {
    /// Backend-specific address (filesystem path or object key prefix).
    pub location: String,
    /// Base name of the container.
    pub display_name: String,
    pub is_archived: bool,
    /// Primary language, `"unknown"` if undetectable.
    pub language: String,
    /// Path recorded by the database creator.
    pub source_location_prefix: String,
    /// Absent for the legacy descriptor format.
    pub creation_metadata: Option<CreationMetadata>,
    /// Archive size, or the recursive size of an unarchived tree (remote
    /// backends report 0).
    pub file_size_bytes: u64,
    pub content_hash: String,
    pub owner: String,
    pub repo: String,
}

impl DiscoveredDatabase {
    /// An archived database; `content_hash` is the SHA-256 of the archive bytes.
    pub fn archived(
        location: impl Into<String>,
        descriptor: Descriptor,
        language: impl Into<String>,
        file_size_bytes: u64,
        content_hash: impl Into<String>,
    ) -> Self {
        Self::new(location.into(), true, descriptor, language.into(), file_size_bytes, content_hash.into())
    }

    /// An unarchived database; the content hash is derived from `location`.
    pub fn unarchived(
        location: impl Into<String>,
        descriptor: Descriptor,
        language: impl Into<String>,
        file_size_bytes: u64,
    ) -> Self {
        let location = location.into();
        let content_hash = hash::location_hash(&location);
        Self::new(location, false, descriptor, language.into(), file_size_bytes, content_hash)
    }

    fn new(
        location: String,
        is_archived: bool,
        descriptor: Descriptor,
        language: String,
        file_size_bytes: u64,
        content_hash: String,
    ) -> Self {
        let display_name = base_name(&location).to_string();
        let ownership = ownership::infer(&descriptor.source_location_prefix, &display_name, descriptor.format);
        Self {
            location,
            display_name,
            is_archived,
            language: if language.is_empty() { UNKNOWN.to_string() } else { language },
            source_location_prefix: descriptor.source_location_prefix,
            creation_metadata: descriptor.creation_metadata,
            file_size_bytes,
            content_hash,
            owner: ownership.owner,
            repo: ownership.repo,
        }
    }

    /// Project into the externally visible catalog record.
    pub fn into_metadata(self, result_url: impl Into<String>) -> DatabaseMetadata {
        DatabaseMetadata::from_discovered(self, result_url.into())
    }
}

fn base_name(location: &str) -> &str {
    location.trim_end_matches(['/', '\\']).rsplit(['/', '\\']).next().unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorFormat;

    fn structured(prefix: &str, creation: Option<CreationMetadata>) -> Descriptor {
        Descriptor {
            format: DescriptorFormat::Structured,
            source_location_prefix: prefix.to_string(),
            primary_language: Some("go".to_string()),
            creation_metadata: creation,
        }
    }

    #[test]
    fn test_unarchived_hash_comes_from_location() {
        let db = DiscoveredDatabase::unarchived("/dbs/repo-db", structured("/home/x/src/acme/widgets", None), "go", 42);
        assert!(!db.is_archived);
        assert_eq!(db.display_name, "repo-db");
        assert_eq!(db.content_hash, hash::location_hash("/dbs/repo-db"));
        assert_eq!((db.owner.as_str(), db.repo.as_str()), ("acme", "widgets"));
        assert_eq!(db.file_size_bytes, 42);
    }

    #[test]
    fn test_archived_legacy_falls_back_to_file_name() {
        let descriptor = Descriptor {
            format: DescriptorFormat::Legacy,
            source_location_prefix: "/opt/src".to_string(),
            primary_language: None,
            creation_metadata: None,
        };
        let db = DiscoveredDatabase::archived("/dbs/u-boot_u-boot_cpp.zip", descriptor, "cpp", 7, "abcdef0123456789");
        assert!(db.is_archived);
        assert_eq!(db.display_name, "u-boot_u-boot_cpp.zip");
        assert_eq!((db.owner.as_str(), db.repo.as_str()), ("u-boot", "u-boot"));
        assert!(db.creation_metadata.is_none());
        assert_eq!(db.content_hash, "abcdef0123456789");
    }

    #[test]
    fn test_empty_language_becomes_unknown() {
        let db = DiscoveredDatabase::unarchived("a/b", structured("/x/y", None), "", 0);
        assert_eq!(db.language, "unknown");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/dbs/repo-db/"), "repo-db");
        assert_eq!(base_name("prefix/a/db"), "db");
        assert_eq!(base_name("db.zip"), "db.zip");
    }
}
