//! Discovery over a flat object namespace.
//!
//! Only unarchived databases are recognised remotely: a database is any key
//! prefix that has a structured descriptor directly beneath it. Object sizes
//! are never summed, so every remote record reports a size of zero.

use crate::error::{ErrorKind, Result};
use crate::store::ObjectStore;
use exn::ResultExt;
use hepc_extract::consts::{LANGUAGE_DIR_PREFIX, STRUCTURED_DESCRIPTOR, UNKNOWN};
use hepc_extract::{Descriptor, DiscoveredDatabase, language};
use std::collections::HashSet;
use tracing::instrument;

/// List every key under `prefix` and extract each database found.
///
/// Container boundaries match the local walk: only the outermost database of
/// a nested pair is reported, and `prefix` itself is never one.
///
/// # Errors
///
/// [`CatalogUnavailable`](ErrorKind::CatalogUnavailable) if the listing
/// fails. Individual databases that can't be read are logged and skipped.
#[instrument(skip(store), fields(store = store.kind()))]
pub async fn discover(store: &dyn ObjectStore, prefix: &str) -> Result<Vec<DiscoveredDatabase>> {
    let keys = store
        .list_keys(prefix)
        .await
        .or_raise(|| ErrorKind::CatalogUnavailable(format!("{}:{prefix}", store.kind())))?;

    let mut databases = Vec::new();
    for candidate in containers(&keys, prefix) {
        match extract_candidate(store, candidate).await {
            Ok(db) => {
                tracing::debug!(location = %db.location, language = %db.language, "Found database");
                databases.push(db);
            },
            Err(err) => tracing::warn!(location = candidate, error = ?err, "Skipping unreadable database"),
        }
    }

    tracing::info!(count = databases.len(), "Remote discovery finished");
    Ok(databases)
}

/// Key prefixes holding a structured descriptor, in listing order.
///
/// The namespace root is never a database itself, and a database nested
/// inside another database is not reported.
fn containers<'a>(keys: &'a [String], prefix: &str) -> Vec<&'a str> {
    let suffix = format!("/{STRUCTURED_DESCRIPTOR}");
    let mut seen = HashSet::new();
    let candidates: Vec<&str> = keys
        .iter()
        .filter_map(|key| key.strip_suffix(suffix.as_str()))
        .filter(|candidate| candidate.strip_prefix(prefix).is_some_and(|rest| !rest.is_empty()))
        .filter(|candidate| seen.insert(*candidate))
        .collect();
    candidates
        .into_iter()
        .filter(|candidate| !candidate.match_indices('/').any(|(i, _)| seen.contains(&candidate[..i])))
        .collect()
}

async fn extract_candidate(store: &dyn ObjectStore, candidate: &str) -> Result<DiscoveredDatabase> {
    let bytes = store.get_object(&format!("{candidate}/{STRUCTURED_DESCRIPTOR}")).await?;
    let descriptor =
        Descriptor::parse_structured(&bytes).or_raise(|| ErrorKind::ParseSkipped(candidate.to_string()))?;
    let language = match &descriptor.primary_language {
        Some(language) => language.clone(),
        None => infer_language(store, candidate).await,
    };
    Ok(DiscoveredDatabase::unarchived(candidate, descriptor, language, 0))
}

/// Look for the first `<candidate>/db-<language>` key.
async fn infer_language(store: &dyn ObjectStore, candidate: &str) -> String {
    let prefix = format!("{candidate}/{LANGUAGE_DIR_PREFIX}");
    match store.first_key(&prefix).await {
        // Only look at what's beneath the database, not the path leading to it.
        Ok(Some(key)) => language::infer([key.strip_prefix(candidate).unwrap_or(key.as_str())]),
        Ok(None) => UNKNOWN.to_string(),
        Err(err) => {
            tracing::debug!(location = candidate, error = ?err, "Language lookup failed");
            UNKNOWN.to_string()
        },
    }
}
