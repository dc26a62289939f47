//! Owner/repository inference.
//!
//! Each tier is a pure function returning an [`Ownership`] where anything it
//! couldn't work out is [`UNKNOWN`]. [`infer`] composes the tiers top-down.

use crate::consts::{GENERIC_OWNERS, UNKNOWN};
use crate::descriptor::DescriptorFormat;

/// Archive suffixes stripped from a file name before it is split.
const ARCHIVE_SUFFIXES: [&str; 3] = [".zip", ".tar.gz", ".tgz"];
/// Separators tried, in order, when splitting a file name.
const FILE_NAME_SEPARATORS: [char; 2] = ['_', '-'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub owner: String,
    pub repo: String,
}
impl Ownership {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }

    /// `"<owner>/<repo>"`
    pub fn project_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Owner carries no information about the project (e.g. `/opt/src`).
    fn has_generic_owner(&self) -> bool {
        GENERIC_OWNERS.contains(&self.owner.as_str())
    }

    /// Fill in from `other` wherever `other` knows better.
    fn or_else_from(self, other: Ownership) -> Self {
        Self {
            owner: if other.owner != UNKNOWN { other.owner } else { self.owner },
            repo: if other.repo != UNKNOWN { other.repo } else { self.repo },
        }
    }
}

/// Infer ownership from the path the database creator recorded.
///
/// The path is cleaned lexically (`.` is dropped, `..` removes the previous
/// segment), split on either separator style, and the last two segments are
/// taken as owner and repository.
///
/// ```
/// use hepc_extract::ownership::{Ownership, from_source_prefix};
/// assert_eq!(from_source_prefix("/home/x/src/acme/widgets"), Ownership::new("acme", "widgets"));
/// assert_eq!(from_source_prefix("/widgets"), Ownership::new("unknown", "widgets"));
/// assert_eq!(from_source_prefix("/"), Ownership::unknown());
/// ```
pub fn from_source_prefix(prefix: &str) -> Ownership {
    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split(['/', '\\']) {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    match segments.as_slice() {
        [.., owner, repo] => Ownership::new(*owner, *repo),
        [repo] => Ownership::new(UNKNOWN, *repo),
        [] => Ownership::unknown(),
    }
}

/// Infer ownership from an archive file name such as
/// `owner_repo_lang-srcVersion_hash.zip`.
///
/// Splits on `_` first and falls back to `-`; the first two tokens are owner
/// and repository. Without either separator nothing can be said.
pub fn from_file_name(file_name: &str) -> Ownership {
    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .unwrap_or(file_name);
    for separator in FILE_NAME_SEPARATORS {
        let mut tokens = stem.split(separator);
        if let (Some(owner), Some(repo)) = (tokens.next(), tokens.next()) {
            let token = |t: &str| if t.is_empty() { UNKNOWN.to_string() } else { t.to_string() };
            return Ownership::new(token(owner), token(repo));
        }
    }
    Ownership::unknown()
}

/// Run the full inference chain for a database.
///
/// The file name tier only applies to legacy databases whose recorded source
/// path produced a generic owner.
pub fn infer(source_location_prefix: &str, file_name: &str, format: DescriptorFormat) -> Ownership {
    let ownership = from_source_prefix(source_location_prefix);
    if format != DescriptorFormat::Legacy || !ownership.has_generic_owner() {
        return ownership;
    }
    ownership.or_else_from(from_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/Users/xavier/src/github/titus-control-plane", "github", "titus-control-plane")]
    #[case("/Users/xavier/src/chris/minio", "chris", "minio")]
    #[case("/owner/repo", "owner", "repo")]
    #[case("/a/b/c/d/owner/repo", "owner", "repo")]
    #[case("C:/Users/dev/src/owner/repo", "owner", "repo")]
    #[case("C:\\Users\\dev\\src\\owner\\repo", "owner", "repo")]
    #[case("/owner/repo/", "owner", "repo")]
    #[case("/owner//repo", "owner", "repo")]
    #[case("/owner/repo/sub/..", "owner", "repo")]
    #[case("/owner/./repo", "owner", "repo")]
    #[case("/repo", "unknown", "repo")]
    #[case("repo", "unknown", "repo")]
    #[case("/", "unknown", "unknown")]
    #[case("", "unknown", "unknown")]
    #[case("/..", "unknown", "unknown")]
    fn test_from_source_prefix(#[case] prefix: &str, #[case] owner: &str, #[case] repo: &str) {
        assert_eq!(from_source_prefix(prefix), Ownership::new(owner, repo));
    }

    #[rstest]
    #[case("u-boot_u-boot_cpp-srcVersion_hash.zip", "u-boot", "u-boot")]
    #[case("u-boot_u-boot_cpp.zip", "u-boot", "u-boot")]
    #[case("owner_repo.zip", "owner", "repo")]
    #[case("owner-repo.zip", "owner", "repo")]
    #[case("owner_repo.tar.gz", "owner", "repo")]
    #[case("owner_repo.tgz", "owner", "repo")]
    #[case("github_actions_runner_javascript.zip", "github", "actions")]
    #[case("database.zip", "unknown", "unknown")]
    #[case("owner_.zip", "owner", "unknown")]
    fn test_from_file_name(#[case] file_name: &str, #[case] owner: &str, #[case] repo: &str) {
        assert_eq!(from_file_name(file_name), Ownership::new(owner, repo));
    }

    #[test]
    fn test_infer_legacy_uses_file_name_for_generic_owner() {
        let ownership = infer("/opt/src", "u-boot_u-boot_cpp.zip", DescriptorFormat::Legacy);
        assert_eq!(ownership, Ownership::new("u-boot", "u-boot"));
    }

    #[test]
    fn test_infer_legacy_keeps_repo_when_file_name_is_uninformative() {
        let ownership = infer("/src/widgets", "database.zip", DescriptorFormat::Legacy);
        assert_eq!(ownership, Ownership::new("src", "widgets"));
    }

    #[test]
    fn test_infer_legacy_with_specific_owner() {
        let ownership = infer("/home/acme/widgets", "other_name.zip", DescriptorFormat::Legacy);
        assert_eq!(ownership, Ownership::new("acme", "widgets"));
    }

    #[test]
    fn test_infer_structured_never_uses_file_name() {
        let ownership = infer("/opt/src", "u-boot_u-boot_cpp.zip", DescriptorFormat::Structured);
        assert_eq!(ownership, Ownership::new("opt", "src"));
    }

    #[test]
    fn test_project_name() {
        assert_eq!(Ownership::new("acme", "widgets").project_name(), "acme/widgets");
        assert_eq!(Ownership::unknown().project_name(), "unknown/unknown");
    }
}
