/// File name of the structured (YAML) descriptor.
pub const STRUCTURED_DESCRIPTOR: &str = "codeql-database.yml";
/// File name of the legacy (XML) descriptor.
pub const LEGACY_DESCRIPTOR: &str = ".dbinfo";
/// Extension (lowercase, without the dot) of archived databases.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// Prefix of the per-language dataset directory inside a database.
pub const LANGUAGE_DIR_PREFIX: &str = "db-";
/// Placeholder used whenever a value cannot be determined.
pub const UNKNOWN: &str = "unknown";
/// Owners that say nothing about the project; they trigger the file name fallback.
pub(crate) const GENERIC_OWNERS: [&str; 3] = ["opt", "src", UNKNOWN];
/// Length of a build CID (and of the content hash prefix standing in for one).
pub const BUILD_CID_LENGTH: usize = 10;

/// Root element of the legacy descriptor.
pub(crate) const LEGACY_ROOT_ELEMENT: &[u8] = b"dbinfo";
/// Element of the legacy descriptor holding the source location prefix.
pub(crate) const LEGACY_SOURCE_PREFIX_ELEMENT: &[u8] = b"sourceLocationPrefix";
