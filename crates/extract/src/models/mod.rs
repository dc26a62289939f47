mod discovered;
mod metadata;

pub use self::discovered::DiscoveredDatabase;
pub use self::metadata::{DatabaseMetadata, GIT_BRANCH, TOOL_NAME, result_url};
