//! Metadata extraction for CodeQL databases.
//!
//! Everything in this crate is pure: it works on bytes (or a `Read + Seek`)
//! that the caller has already obtained, and never touches the filesystem or
//! network itself. The storage crate decides *where* databases are; this crate
//! decides *what* they are.
//!
//! # Overview
//! - [`Descriptor`] parses both descriptor generations (`codeql-database.yml`
//!   and the legacy `.dbinfo`).
//! - [`ownership`] infers owner/repository through an ordered chain of
//!   heuristics.
//! - [`hash`] computes content hashes and build CIDs.
//! - [`extract_archive`] ties it together for zip archives; unarchived
//!   databases are assembled with [`DiscoveredDatabase::unarchived`].
//! - [`DatabaseMetadata`] is the catalog record served to clients.

mod archive;
pub mod consts;
mod descriptor;
pub mod error;
pub mod hash;
pub mod language;
pub mod models;
pub mod ownership;

pub use crate::archive::extract_archive;
pub use crate::descriptor::{CreationMetadata, Descriptor, DescriptorFormat};
pub use crate::models::{DatabaseMetadata, DiscoveredDatabase};
