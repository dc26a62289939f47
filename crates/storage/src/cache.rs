//! Time-bounded cache of the projected catalog.
//!
//! Each backend owns one [`MetadataCache`]. Reads within the TTL are served
//! from memory; a miss releases the read lock, runs the scan, and stores the
//! result under the write lock. Concurrent misses may each run a scan: the
//! last one to finish wins.

use crate::error::Result;
use hepc_extract::DatabaseMetadata;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Catalog freshness window used when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of "now" for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Default)]
struct CacheState {
    catalog: Vec<DatabaseMetadata>,
    refreshed_at: Option<Instant>,
}

pub struct MetadataCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached catalog, or run `scan` and cache what it produces.
    ///
    /// An empty catalog never counts as a hit. A failed scan is returned to
    /// the caller and leaves the previous state untouched.
    pub async fn get_or_refresh<F, Fut>(&self, scan: F) -> Result<Vec<DatabaseMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<DatabaseMetadata>>>,
    {
        {
            let state = self.state.read().await;
            if let Some(refreshed_at) = state.refreshed_at
                && !state.catalog.is_empty()
                && self.clock.now().saturating_duration_since(refreshed_at) < self.ttl
            {
                tracing::debug!(entries = state.catalog.len(), "Catalog cache hit");
                return Ok(state.catalog.clone());
            }
        }

        tracing::debug!("Catalog cache miss, scanning");
        let catalog = scan().await?;
        let mut state = self.state.write().await;
        state.catalog = catalog.clone();
        state.refreshed_at = Some(self.clock.now());
        Ok(catalog)
    }

    /// Mark the cached catalog stale; the next read will scan.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.catalog.clear();
        state.refreshed_at = None;
    }

    /// Invalidate and release the memory held by the cached catalog.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = CacheState::default();
    }
}
