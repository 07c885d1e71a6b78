//! Error types for topology resolution.

use crate::table::{SourceError, TableKind};

pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// The element's tables could not be turned into a snapshot. Query entry
    /// points convert this into an empty hop set.
    #[error("no topology data for element '{element}': {reason}")]
    ElementDataUnavailable { element: String, reason: Unavailable },

    #[error("invalid table layout: {0}")]
    InvalidLayout(String),

    #[error("failed to parse topology config: {0}")]
    LayoutParse(#[from] serde_json::Error),

    #[error("failed to read topology config: {0}")]
    Io(#[from] std::io::Error),
}

impl TopologyError {
    pub(crate) fn unavailable(element: impl Into<String>, reason: Unavailable) -> Self {
        Self::ElementDataUnavailable {
            element: element.into(),
            reason,
        }
    }
}

/// Why an element snapshot could not be built.
#[derive(Debug, thiserror::Error)]
pub enum Unavailable {
    #[error("element lookup failed: {0}")]
    Lookup(#[source] SourceError),

    #[error("{0} table could not be fetched: {1}")]
    Fetch(TableKind, #[source] SourceError),

    #[error("{0} table is empty")]
    Empty(TableKind),
}
