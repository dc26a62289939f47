use crate::consts::{LANGUAGE_DIR_PREFIX, UNKNOWN};

/// Infer the primary language from the members of a database.
///
/// Looks through every `/`-separated component of every member for the
/// first `db-<language>` entry. Returns `"unknown"` when there is none.
///
/// ```
/// use hepc_extract::language::infer;
/// assert_eq!(infer(["widgets/codeql-database.yml", "widgets/db-go/default/strings"]), "go");
/// assert_eq!(infer(["widgets/codeql-database.yml"]), "unknown");
/// ```
pub fn infer<I, S>(members: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    members
        .into_iter()
        .find_map(|member| {
            member
                .as_ref()
                .split('/')
                .filter_map(|component| component.strip_prefix(LANGUAGE_DIR_PREFIX))
                .find(|language| !language.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN.to_string())
}
