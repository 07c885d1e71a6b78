//! Process-wide cache of element snapshots.
//!
//! Entries expire once they are older than the configured TTL. The map is
//! guarded by a single mutex that is only held for lookups, installs and
//! pruning; snapshot construction (which blocks on the host) always happens
//! outside it. Two racing rebuilds of the same element both succeed and the
//! last install wins.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    config::{TableLayout, TopologyConfig},
    error::{Result, TopologyError, Unavailable},
    repository::Repository,
    table::{ElementFilter, TableSource},
};

/// Time source for expiry decisions.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    repository: Arc<Repository>,
    built_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_elements: usize,
    pub ttl: Duration,
    pub hits: u64,
    pub misses: u64,
    pub fleet_refreshes: u64,
}

pub struct SnapshotCache {
    source: Arc<dyn TableSource>,
    layout: TableLayout,
    ttl: Duration,
    max_depth: usize,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fleet_refreshes: AtomicU64,
}

impl Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("ttl", &self.ttl)
            .field("max_depth", &self.max_depth)
            .field("cached_elements", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl SnapshotCache {
    pub fn new(
        source: Arc<dyn TableSource>,
        config: &TopologyConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            layout: config.table_layout(),
            ttl: config.cache_ttl(),
            max_depth: config.max_depth,
            clock,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fleet_refreshes: AtomicU64::new(0),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.built_at) <= self.ttl
    }

    fn build(&self, element: &str) -> Result<Arc<Repository>> {
        Repository::build(self.source.as_ref(), &self.layout, element, self.max_depth).map(Arc::new)
    }

    /// Return the element's snapshot, building it if absent or expired.
    ///
    /// Every call prunes all expired entries.
    pub fn get_snapshot(&self, element: &str) -> Result<Arc<Repository>> {
        let now = self.clock.now();
        {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| self.is_fresh(entry, now));
            if entries.len() < before {
                trace!("[CCH] Pruned {} expired snapshots", before - entries.len());
            }
            if let Some(entry) = entries.get(element) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.repository.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("[CCH] Building snapshot for '{}'", element);
        let repository = self.build(element)?;
        self.entries.lock().insert(
            element.to_string(),
            CacheEntry {
                repository: repository.clone(),
                built_at: now,
            },
        );
        Ok(repository)
    }

    /// Rebuild every element matching `filter` and replace the whole map.
    ///
    /// Elements whose snapshot cannot be built are left out of the new map.
    /// Returns the number of snapshots installed.
    ///
    /// # Errors
    ///
    /// Fails only if the element list itself cannot be retrieved, in which
    /// case the current map is kept.
    pub fn force_refresh_all(&self, filter: &ElementFilter) -> Result<usize> {
        let elements = self.source.list_elements_by_type(filter).map_err(|e| {
            TopologyError::unavailable(
                format!("{}/{}", filter.protocol, filter.version),
                Unavailable::Lookup(e),
            )
        })?;

        let now = self.clock.now();
        let mut fresh = HashMap::with_capacity(elements.len());
        for element in &elements {
            match self.build(&element.name) {
                Ok(repository) => {
                    fresh.insert(
                        element.name.clone(),
                        CacheEntry {
                            repository,
                            built_at: now,
                        },
                    );
                }
                Err(e) => warn!("[CCH] Skipping '{}' during refresh: {}", element.name, e),
            }
        }

        let installed = fresh.len();
        *self.entries.lock() = fresh;
        self.fleet_refreshes.fetch_add(1, Ordering::Relaxed);
        info!(
            "[CCH] Refreshed {}/{} snapshots for {}/{}",
            installed,
            elements.len(),
            filter.protocol,
            filter.version
        );
        Ok(installed)
    }

    /// Drop the element's snapshot so the next query rebuilds it.
    pub fn invalidate(&self, element: &str) -> bool {
        self.entries.lock().remove(element).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_elements: self.entries.lock().len(),
            ttl: self.ttl,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fleet_refreshes: self.fleet_refreshes.load(Ordering::Relaxed),
        }
    }
}
