//! Path validation for requested database files.
//!
//! Requests name files relative to the storage root. Lexical validation here
//! guarantees the name can't climb out of that root; backends that can also
//! follow links (the local filesystem) re-check after resolution.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Normalizes a requested name into a path relative to the storage root.
///
/// `.` and empty segments vanish, `..` consumes the segment before it, and a
/// leading `/` is ignored. Backslashes are not separators here.
///
/// # Errors
///
/// - [`AccessDenied`](ErrorKind::AccessDenied) when a `..` would climb above
///   the root, a segment holds a NUL byte, or the path carries a drive prefix.
/// - [`NotAFile`](ErrorKind::NotAFile) when nothing is left, i.e. the name
///   is the root itself.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use hepc_storage::validate_path;
///
/// assert!(validate_path("acme/widgets.zip").is_ok());
/// assert!(validate_path("a/../db.zip").is_ok());
/// assert!(validate_path("../../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("/nightly/../stable/.//go/db.zip").unwrap(),
///     Path::new("stable/go/db.zip")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let requested = path.as_ref();
    let denied = || ErrorKind::AccessDenied(requested.to_path_buf());
    let mut segments: Vec<&OsStr> = Vec::new();
    for component in requested.components() {
        match component {
            Component::RootDir | Component::CurDir => continue,
            Component::Prefix(_) => exn::bail!(denied()),
            Component::ParentDir => {
                segments.pop().ok_or_raise(denied)?;
            },
            // The OS would truncate the name at the NUL.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(denied()),
            Component::Normal(segment) => segments.push(segment),
        }
    }
    if segments.is_empty() {
        exn::bail!(ErrorKind::NotAFile(requested.to_path_buf()));
    }
    Ok(segments.into_iter().collect())
}
