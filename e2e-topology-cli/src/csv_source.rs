//! [`TableSource`] over CSV exports of device tables.
//!
//! The export directory holds one subdirectory per element; each table is a
//! headerless `<table id>.csv` file inside it. Every cell is read as a string,
//! the way the host renders table cells.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use e2e_topology::{CellValue, ElementFilter, ElementRef, SourceError, Table, TableId, TableSource};

#[derive(Debug, Clone)]
pub struct CsvTableSource {
    root: PathBuf,
}

impl CsvTableSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn element_names(&self) -> Result<Vec<String>, SourceError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| SourceError::Transport(format!("{}: {}", self.root.display(), e)))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::Transport(e.to_string()))?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn table_path(&self, element: &str, table_id: TableId) -> PathBuf {
        self.root.join(element).join(format!("{table_id}.csv"))
    }
}

fn read_table(path: &Path, table_id: TableId) -> Result<Table, SourceError> {
    let mut reader = match csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
    {
        Ok(reader) => reader,
        Err(e) => {
            return Err(match e.kind() {
                csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound => {
                    SourceError::TableNotFound(table_id)
                }
                _ => SourceError::Transport(e.to_string()),
            });
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Malformed {
            table_id,
            reason: e.to_string(),
        })?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::from(cell)
                    }
                })
                .collect(),
        );
    }
    Ok(Table::new(rows))
}

impl TableSource for CsvTableSource {
    fn find_element_by_name(&self, name: &str) -> Result<ElementRef, SourceError> {
        self.element_names()?
            .iter()
            .position(|n| n == name)
            .map(|i| ElementRef::new(1, i as i32 + 1, name))
            .ok_or_else(|| SourceError::ElementNotFound(name.to_string()))
    }

    /// Every element directory matches; exports carry no protocol metadata.
    fn list_elements_by_type(
        &self,
        filter: &ElementFilter,
    ) -> Result<Vec<ElementRef>, SourceError> {
        tracing::debug!(
            "Listing all exported elements for {}/{}",
            filter.protocol,
            filter.version
        );
        Ok(self
            .element_names()?
            .into_iter()
            .enumerate()
            .map(|(i, name)| ElementRef::new(1, i as i32 + 1, name))
            .collect())
    }

    fn fetch_table(
        &self,
        element: &ElementRef,
        table_id: TableId,
        _filters: &[String],
    ) -> Result<Table, SourceError> {
        read_table(&self.table_path(&element.name, table_id), table_id)
    }
}
