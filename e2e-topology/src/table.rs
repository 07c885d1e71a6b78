//! Contracts consumed from the host platform: element lookup and table fetch.
//!
//! The resolver never talks to the wire. A host integration implements
//! [`TableSource`] over its RPC channel and hands rows back as a rectangular
//! array of [`CellValue`]s, indexed by the column ordinals configured in
//! [`TableLayout`](crate::config::TableLayout).

use serde::{Deserialize, Serialize};

/// Opaque identifier of a device table (the host's parameter id).
pub type TableId = u32;

/// The tables the resolver reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TableKind {
    Edges,
    Inputs,
    Outputs,
    InputStatistics,
    OutputStatistics,
}

/// Reference to a managed element as returned by the host lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub dma_id: i32,
    pub element_id: i32,
    pub name: String,
}

impl ElementRef {
    pub fn new(dma_id: i32, element_id: i32, name: impl Into<String>) -> Self {
        Self {
            dma_id,
            element_id,
            name: name.into(),
        }
    }
}

/// Platform-level selector for a fleet of elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFilter {
    pub protocol: String,
    pub version: String,
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self {
            protocol: "Techex MWCore".to_string(),
            version: "Production".to_string(),
        }
    }
}

/// A single typed cell as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl CellValue {
    /// Render the cell the way the host renders cells as strings.
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Double(v) => v.to_string(),
            CellValue::String(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Double(v) => Some(*v),
            CellValue::String(s) => s.trim().parse().ok(),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

/// Row-major table snapshot. Rows may be ragged; missing cells read as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// String value of a cell, empty when the cell is missing.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col)
            .map(CellValue::as_string)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("element '{0}' not found")]
    ElementNotFound(String),

    #[error("table {0} not found")]
    TableNotFound(TableId),

    #[error("table {table_id} is malformed: {reason}")]
    Malformed { table_id: TableId, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Host-side data access. Implementations issue blocking calls and must be
/// callable from several threads at once.
pub trait TableSource: Send + Sync {
    fn find_element_by_name(&self, name: &str) -> Result<ElementRef, SourceError>;

    fn list_elements_by_type(&self, filter: &ElementFilter) -> Result<Vec<ElementRef>, SourceError>;

    fn fetch_table(
        &self,
        element: &ElementRef,
        table_id: TableId,
        filters: &[String],
    ) -> Result<Table, SourceError>;
}
