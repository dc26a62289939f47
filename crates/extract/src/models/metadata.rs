use super::DiscoveredDatabase;
use crate::consts::UNKNOWN;
use crate::hash;
use crate::ownership::Ownership;
use serde::{Deserialize, Serialize};

/// Branch reported for every database; descriptors don't record one.
pub const GIT_BRANCH: &str = "HEAD";
/// Tool name used when the language is unknown.
pub const TOOL_NAME: &str = "codeql";

/// Catalog record for a single database, as served to clients.
///
/// Field names on the wire are a stable contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Primary identifier of the database (SHA-256 based).
    pub content_hash: String,
    /// Derived identity distinguishing build contexts.
    pub build_cid: String,
    pub git_branch: String,
    pub git_commit_id: String,
    pub git_owner: String,
    pub git_repo: String,
    pub ingestion_datetime_utc: String,
    pub primary_language: String,
    /// Where the database can be downloaded from.
    pub result_url: String,
    pub tool_name: String,
    pub tool_version: String,
    /// `"<owner>/<repo>"`
    #[serde(rename = "projname")]
    pub project_name: String,
    #[serde(rename = "db_file_size")]
    pub db_file_size_bytes: u64,
}

impl DatabaseMetadata {
    pub fn from_discovered(db: DiscoveredDatabase, result_url: String) -> Self {
        let build_cid = hash::build_cid_for(db.creation_metadata.as_ref(), &db.language, &db.content_hash);
        let tool_name = match db.language.as_str() {
            "" | UNKNOWN => TOOL_NAME.to_string(),
            language => format!("{TOOL_NAME}-{language}"),
        };
        let creation = db.creation_metadata.unwrap_or_default();
        let ownership = Ownership::new(db.owner, db.repo);
        Self {
            content_hash: db.content_hash,
            build_cid,
            git_branch: GIT_BRANCH.to_string(),
            git_commit_id: creation.sha,
            project_name: ownership.project_name(),
            git_owner: ownership.owner,
            git_repo: ownership.repo,
            ingestion_datetime_utc: creation.creation_time,
            primary_language: db.language,
            result_url,
            tool_name,
            tool_version: creation.cli_version,
            db_file_size_bytes: db.file_size_bytes,
        }
    }
}

/// `<endpoint>/db/<relative-location>`, tolerating stray slashes on either side.
pub fn result_url(endpoint: &str, relative_location: &str) -> String {
    format!("{}/db/{}", endpoint.trim_end_matches('/'), relative_location.trim_start_matches('/'))
}
