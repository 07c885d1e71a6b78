//! Resolver configuration.
//!
//! Column ordinals are a versioned contract with the device firmware: the same
//! semantic field has lived at different positions across revisions, so the
//! layout is injected here instead of being baked into the repository code.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TopologyError},
    table::{ElementFilter, TableId},
};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Upper bound on `max_depth`; hop numbers are signed 32-bit.
pub const MAX_DEPTH_LIMIT: usize = 1024;

const FORCE_FULL_TABLE: &str = "forceFullTable=true";

fn full_table() -> Vec<String> {
    vec![FORCE_FULL_TABLE.to_string()]
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutRevision {
    #[default]
    Current,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeColumns {
    pub table_id: TableId,
    #[serde(default = "full_table")]
    pub filters: Vec<String>,
    pub id: usize,
    pub name: usize,
    /// Semicolon-delimited `ip[:port]` list.
    pub address: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointColumns {
    pub table_id: TableId,
    #[serde(default = "full_table")]
    pub filters: Vec<String>,
    pub id: usize,
    pub name: usize,
    pub status: usize,
    pub protocol: usize,
    pub transport: usize,
    pub ip: usize,
    pub port: usize,
    pub stream: usize,
    pub edge: usize,
    /// Separate active flag column. Only inputs carry one; outputs derive
    /// activity from `status`.
    #[serde(default)]
    pub active: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsColumns {
    pub table_id: TableId,
    pub filters: Vec<String>,
    pub key: usize,
    pub bitrate: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub edges: EdgeColumns,
    pub inputs: EndpointColumns,
    pub outputs: EndpointColumns,
    #[serde(default)]
    pub input_statistics: Option<StatisticsColumns>,
    #[serde(default)]
    pub output_statistics: Option<StatisticsColumns>,
}

impl TableLayout {
    pub fn current() -> Self {
        Self {
            edges: EdgeColumns {
                table_id: 8500,
                filters: full_table(),
                id: 0,
                name: 1,
                address: 9,
            },
            inputs: EndpointColumns {
                table_id: 9600,
                filters: full_table(),
                id: 0,
                name: 1,
                status: 20,
                protocol: 3,
                transport: 5,
                ip: 30,
                port: 7,
                stream: 23,
                edge: 31,
                active: Some(27),
            },
            outputs: EndpointColumns {
                table_id: 8900,
                filters: full_table(),
                id: 0,
                name: 1,
                status: 2,
                protocol: 3,
                transport: 15,
                ip: 4,
                port: 5,
                stream: 9,
                edge: 10,
                active: None,
            },
            input_statistics: Some(StatisticsColumns {
                table_id: 11200,
                filters: vec![FORCE_FULL_TABLE.to_string(), "columns=11206".to_string()],
                key: 0,
                bitrate: 1,
            }),
            output_statistics: Some(StatisticsColumns {
                table_id: 11400,
                filters: vec![FORCE_FULL_TABLE.to_string(), "columns=11406".to_string()],
                key: 0,
                bitrate: 1,
            }),
        }
    }

    /// Older firmware exposes the input IP and edge columns at 58/59.
    pub fn legacy() -> Self {
        let mut layout = Self::current();
        layout.inputs.ip = 58;
        layout.inputs.edge = 59;
        layout
    }

    pub fn for_revision(revision: LayoutRevision) -> Self {
        match revision {
            LayoutRevision::Current => Self::current(),
            LayoutRevision::Legacy => Self::legacy(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ids = [
            ("edges", self.edges.table_id),
            ("inputs", self.inputs.table_id),
            ("outputs", self.outputs.table_id),
        ];
        for (name, id) in ids {
            if id == 0 {
                return Err(TopologyError::InvalidLayout(format!(
                    "{name} table id must be non-zero"
                )));
            }
        }
        for stats in [&self.input_statistics, &self.output_statistics]
            .into_iter()
            .flatten()
        {
            if stats.table_id == 0 {
                return Err(TopologyError::InvalidLayout(
                    "statistics table id must be non-zero".to_string(),
                ));
            }
            if stats.key == stats.bitrate {
                return Err(TopologyError::InvalidLayout(format!(
                    "statistics table {} uses column {} for both key and bitrate",
                    stats.table_id, stats.key
                )));
            }
        }
        Ok(())
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::current()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub revision: LayoutRevision,
    /// Explicit layout; overrides `revision` when present.
    pub layout: Option<TableLayout>,
    pub cache_ttl_secs: u64,
    pub max_depth: usize,
    pub fleet_filter: ElementFilter,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            revision: LayoutRevision::default(),
            layout: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_depth: DEFAULT_MAX_DEPTH,
            fleet_filter: ElementFilter::default(),
        }
    }
}

impl TopologyConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The layout actually in effect.
    pub fn table_layout(&self) -> TableLayout {
        self.layout
            .clone()
            .unwrap_or_else(|| TableLayout::for_revision(self.revision))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(TopologyError::InvalidLayout(
                "cache_ttl_secs must be non-zero".to_string(),
            ));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(TopologyError::InvalidLayout(format!(
                "max_depth {} exceeds {}",
                self.max_depth, MAX_DEPTH_LIMIT
            )));
        }
        self.table_layout().validate()
    }
}
