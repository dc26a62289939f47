//! Locating database containers within a namespace.
//!
//! Both engines produce [`DiscoveredDatabase`](hepc_extract::DiscoveredDatabase)
//! records in enumeration order, deduplicated by location. A container that
//! can't be read is logged and skipped; only failing to enumerate the
//! namespace root is fatal.

pub mod local;
pub mod remote;
