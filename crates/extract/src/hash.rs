//! Content hashes and build identifiers.

use crate::consts::BUILD_CID_LENGTH;
use crate::descriptor::CreationMetadata;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Lowercase hex SHA-256 of a byte stream (the archive bytes of an archived
/// database).
pub fn content_hash_reader(mut reader: impl Read) -> Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).or_raise(|| ErrorKind::Io)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex SHA-256 of an in-memory value.
pub fn content_hash_bytes(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Surrogate content hash of an unarchived database, derived from its
/// location rather than from the (potentially huge) directory tree.
pub fn location_hash(location: &str) -> String {
    content_hash_bytes(location.as_bytes())
}

/// Build context identifier: the first ten hex characters of the SHA-256 of
/// `"<cliVersion> <creationTime> <language> <sourceSHA>"`.
pub fn build_cid(cli_version: &str, creation_time: &str, language: &str, source_sha: &str) -> String {
    let input = format!("{cli_version} {creation_time} {language} {source_sha}");
    let mut cid = content_hash_bytes(input);
    cid.truncate(BUILD_CID_LENGTH);
    cid
}

/// Build CID for a database, falling back to a prefix of its content hash
/// when the descriptor carried no creation metadata.
pub fn build_cid_for(creation: Option<&CreationMetadata>, language: &str, content_hash: &str) -> String {
    match creation {
        Some(c) => build_cid(&c.cli_version, &c.creation_time, language, &c.sha),
        None => content_hash.chars().take(BUILD_CID_LENGTH).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_content_hash_known_value() {
        // echo -n "hello" | sha256sum
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(content_hash_bytes("hello"), expected);
        assert_eq!(content_hash_reader(Cursor::new(b"hello")).unwrap(), expected);
    }

    #[test]
    fn test_location_hash_is_deterministic() {
        let a = location_hash("/data/dbs/acme-widgets");
        assert_eq!(a, location_hash("/data/dbs/acme-widgets"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, location_hash("/data/dbs/acme-gadgets"));
    }

    #[test]
    fn test_build_cid_length_and_stability() {
        let cid = build_cid("2.15.0", "2023-11-01T12:34:56Z", "go", "abc123");
        assert_eq!(cid.len(), 10);
        assert_eq!(cid, build_cid("2.15.0", "2023-11-01T12:34:56Z", "go", "abc123"));
        assert!(cid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_build_cid_differs_per_input() {
        let base = build_cid("2.15.0", "t1", "go", "abc");
        assert_ne!(base, build_cid("2.15.1", "t1", "go", "abc"));
        assert_ne!(base, build_cid("2.15.0", "t2", "go", "abc"));
        assert_ne!(base, build_cid("2.15.0", "t1", "java", "abc"));
        assert_ne!(base, build_cid("2.15.0", "t1", "go", "abd"));
    }

    #[test]
    fn test_build_cid_matches_manual_digest() {
        let expected = &content_hash_bytes("2.15.0 2023-01-01 python deadbeef")[..10];
        assert_eq!(build_cid("2.15.0", "2023-01-01", "python", "deadbeef"), expected);
    }

    #[test]
    fn test_build_cid_falls_back_to_content_hash() {
        let hash = content_hash_bytes("archive bytes");
        assert_eq!(build_cid_for(None, "go", &hash), &hash[..10]);
        let creation = CreationMetadata {
            sha: "abc".to_string(),
            cli_version: "2.15.0".to_string(),
            creation_time: "t".to_string(),
        };
        assert_eq!(build_cid_for(Some(&creation), "go", &hash), build_cid("2.15.0", "t", "go", "abc"));
    }
}
