//! Query entry points exposed to the presentation layer.

use std::{path::PathBuf, sync::Arc};

use tracing::{debug, warn};

use crate::{
    Builder, Result,
    cache::{CacheStats, Clock, SnapshotCache, SystemClock},
    config::TopologyConfig,
    hop::Hop,
    repository::HopSet,
    table::{ElementFilter, TableSource},
};

/// Environment variable naming a JSON config file, used when the builder was
/// given neither a config nor a config file.
pub const CONFIG_FILE_ENV: &str = "E2E_TOPOLOGY_CONFIG";

pub struct TopologyResolverBuilder {
    source: Arc<dyn TableSource>,
    config: Option<TopologyConfig>,
    config_file: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl TopologyResolverBuilder {
    pub fn with_config(mut self, config: TopologyConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Builder for TopologyResolverBuilder {
    type Output = TopologyResolver;

    fn build(self) -> Result<TopologyResolver> {
        // explicit config, then config file, then environment, then defaults
        let config = if let Some(config) = self.config {
            config.validate()?;
            config
        } else if let Some(path) = self.config_file {
            TopologyConfig::from_json_file(path)?
        } else if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            debug!("[RSV] Loading config from {}={}", CONFIG_FILE_ENV, path);
            TopologyConfig::from_json_file(path)?
        } else {
            TopologyConfig::default()
        };

        Ok(TopologyResolver {
            cache: SnapshotCache::new(self.source, &config, self.clock),
            config,
        })
    }
}

/// Resolves hop chains for `(element, edge, stream)` queries over cached
/// element snapshots. Safe to share across threads.
#[derive(Debug)]
pub struct TopologyResolver {
    cache: SnapshotCache,
    config: TopologyConfig,
}

impl TopologyResolver {
    pub fn builder(source: Arc<dyn TableSource>) -> TopologyResolverBuilder {
        TopologyResolverBuilder {
            source,
            config: None,
            config_file: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve the hop set, surfacing snapshot failures.
    pub fn try_resolve_hops(&self, element: &str, edge: &str, stream: &str) -> Result<Arc<HopSet>> {
        let snapshot = self.cache.get_snapshot(element)?;
        Ok(snapshot.hops(edge, stream))
    }

    /// Resolve the hop chain of `(edge, stream)` on `element`, ordered by hop
    /// number. Any failure yields an empty chain.
    pub fn resolve_hops(&self, element: &str, edge: &str, stream: &str) -> Vec<Hop> {
        match self.try_resolve_hops(element, edge, stream) {
            Ok(hops) => sorted(&hops),
            Err(e) => {
                warn!(
                    "[RSV] No topology for {}/{} on '{}': {}",
                    edge, stream, element, e
                );
                Vec::new()
            }
        }
    }

    /// Rebuild the snapshots of every element matching `filter`. Returns the
    /// number of snapshots installed, 0 if the element list was unavailable.
    pub fn refresh_all_snapshots(&self, filter: &ElementFilter) -> usize {
        self.cache.force_refresh_all(filter).unwrap_or_else(|e| {
            warn!("[RSV] Snapshot refresh failed: {}", e);
            0
        })
    }

    /// [`refresh_all_snapshots`](Self::refresh_all_snapshots) with the
    /// configured fleet filter.
    pub fn refresh_fleet(&self) -> usize {
        self.refresh_all_snapshots(&self.config.fleet_filter)
    }
}

/// Hops ordered by hop number, then source, then destination.
pub fn sorted(hops: &HopSet) -> Vec<Hop> {
    let mut hops: Vec<Hop> = hops.iter().cloned().collect();
    hops.sort_by(|a, b| {
        a.hop_number
            .cmp(&b.hop_number)
            .then_with(|| a.identity().cmp(&b.identity()))
    });
    hops
}
