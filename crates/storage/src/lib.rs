//! Where CodeQL databases live, and how they are found.
//!
//! - [`discovery`] walks a namespace (directory tree or object-store prefix)
//!   and extracts every database in it.
//! - [`cache`] keeps the resulting catalog around for a while.
//! - [`backend`] puts both behind the [`StorageBackend`] trait, together with
//!   streaming access to the files themselves.

pub mod backend;
pub mod cache;
pub mod discovery;
pub mod error;
mod path;
pub mod store;

pub use crate::backend::{Fetched, LocalBackend, RemoteBackend, StorageBackend};
pub use crate::cache::MetadataCache;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
