//! End-to-end stream topology resolution for media gateway elements.
//!
//! Given an element, an edge and a stream name, the resolver reconstructs the
//! chain of hops the stream takes through the element's inputs and outputs,
//! upstream and downstream of the starting edge. Device tables are read through
//! a host-provided [`TableSource`] and cached per element.

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod hop;
pub mod matcher;
pub mod repository;
pub mod resolver;
pub mod rows;
pub mod table;
pub mod walker;

pub use cache::{CacheStats, Clock, ManualClock, SnapshotCache, SystemClock};
pub use config::{LayoutRevision, TableLayout, TopologyConfig};
pub use error::{Result, TopologyError, Unavailable};
pub use hop::{Hop, HopEndpoint};
pub use repository::{HopSet, Repository};
pub use resolver::{TopologyResolver, TopologyResolverBuilder};
pub use table::{CellValue, ElementFilter, ElementRef, SourceError, Table, TableId, TableSource};

pub trait Builder {
    type Output;
    fn build(self) -> Result<Self::Output>;
}
