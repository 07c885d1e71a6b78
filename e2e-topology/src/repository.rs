//! Immutable per-element snapshot of edges, inputs and outputs.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    config::{DEFAULT_MAX_DEPTH, EdgeColumns, EndpointColumns, StatisticsColumns, TableLayout},
    entity::{Edge, Endpoint, EndpointKind, Protocol, TransportMode, derive_active},
    error::{Result, TopologyError, Unavailable},
    hop::Hop,
    table::{ElementRef, Table, TableKind, TableSource},
    walker,
};

pub type HopSet = HashSet<Hop>;

type EdgeName = String;
type StreamName = String;
type GroupIndex = HashMap<EdgeName, HashMap<StreamName, Vec<usize>>>;

fn index_groups(endpoints: &[Endpoint]) -> GroupIndex {
    let mut index = GroupIndex::new();
    for (i, endpoint) in endpoints.iter().enumerate() {
        index
            .entry(endpoint.edge.clone())
            .or_default()
            .entry(endpoint.stream.clone())
            .or_default()
            .push(i);
    }
    index
}

/// Snapshot of one element. Endpoint data never changes after construction;
/// only the per-(edge, stream) hop memo grows.
#[derive(Debug)]
pub struct Repository {
    element: String,
    edges: Vec<Edge>,
    inputs: Vec<Endpoint>,
    outputs: Vec<Endpoint>,
    edge_index: HashMap<EdgeName, usize>,
    inputs_by_group: GroupIndex,
    outputs_by_group: GroupIndex,
    max_depth: usize,
    hops: Mutex<HashMap<(EdgeName, StreamName), Arc<HopSet>>>,
}

impl Repository {
    pub fn new(
        element: impl Into<String>,
        edges: Vec<Edge>,
        inputs: Vec<Endpoint>,
        outputs: Vec<Endpoint>,
    ) -> Self {
        let mut edge_index = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            // first row wins on duplicate names
            edge_index.entry(edge.name.clone()).or_insert(i);
        }
        let inputs_by_group = index_groups(&inputs);
        let outputs_by_group = index_groups(&outputs);
        Self {
            element: element.into(),
            edges,
            inputs,
            outputs,
            edge_index,
            inputs_by_group,
            outputs_by_group,
            max_depth: DEFAULT_MAX_DEPTH,
            hops: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetch the element's tables through `source` and build a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::ElementDataUnavailable`] when the element
    /// cannot be found, or when the edges, inputs or outputs table cannot be
    /// fetched or is empty. Statistics tables are optional.
    pub fn build(
        source: &dyn TableSource,
        layout: &TableLayout,
        element: &str,
        max_depth: usize,
    ) -> Result<Self> {
        let element_ref = source
            .find_element_by_name(element)
            .map_err(|e| TopologyError::unavailable(element, Unavailable::Lookup(e)))?;
        debug!(
            "[REP] Building snapshot: element={} dma={} eid={}",
            element, element_ref.dma_id, element_ref.element_id
        );

        let edges_table = fetch_required(
            source,
            &element_ref,
            TableKind::Edges,
            layout.edges.table_id,
            &layout.edges.filters,
        )?;
        let edges = parse_edges(&edges_table, &layout.edges);

        let input_bitrates = fetch_bitrates(
            source,
            &element_ref,
            TableKind::InputStatistics,
            layout.input_statistics.as_ref(),
        );
        let inputs = parse_endpoints(
            &fetch_required(
                source,
                &element_ref,
                TableKind::Inputs,
                layout.inputs.table_id,
                &layout.inputs.filters,
            )?,
            &layout.inputs,
            EndpointKind::Input,
            &input_bitrates,
        );

        let output_bitrates = fetch_bitrates(
            source,
            &element_ref,
            TableKind::OutputStatistics,
            layout.output_statistics.as_ref(),
        );
        let outputs = parse_endpoints(
            &fetch_required(
                source,
                &element_ref,
                TableKind::Outputs,
                layout.outputs.table_id,
                &layout.outputs.filters,
            )?,
            &layout.outputs,
            EndpointKind::Output,
            &output_bitrates,
        );

        for (kind, parsed) in [
            (TableKind::Edges, edges.len()),
            (TableKind::Inputs, inputs.len()),
            (TableKind::Outputs, outputs.len()),
        ] {
            if parsed == 0 {
                return Err(TopologyError::unavailable(element, Unavailable::Empty(kind)));
            }
        }

        debug!(
            "[REP] Snapshot ready: element={} edges={} inputs={} outputs={}",
            element,
            edges.len(),
            inputs.len(),
            outputs.len()
        );
        Ok(Self::new(element, edges, inputs, outputs).with_max_depth(max_depth))
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn inputs(&self) -> &[Endpoint] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Endpoint] {
        &self.outputs
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.edge_index.get(name).map(|&i| &self.edges[i])
    }

    /// Inputs assigned to `stream` on `edge`.
    pub fn inputs_in<'a>(
        &'a self,
        edge: &str,
        stream: &str,
    ) -> impl Iterator<Item = &'a Endpoint> + use<'a> {
        group(&self.inputs_by_group, edge, stream).map(move |&i| &self.inputs[i])
    }

    /// Outputs assigned to `stream` on `edge`.
    pub fn outputs_in<'a>(
        &'a self,
        edge: &str,
        stream: &str,
    ) -> impl Iterator<Item = &'a Endpoint> + use<'a> {
        group(&self.outputs_by_group, edge, stream).map(move |&i| &self.outputs[i])
    }

    /// The full hop set for `(edge, stream)`, walked once per snapshot.
    pub fn hops(&self, edge: &str, stream: &str) -> Arc<HopSet> {
        let key = (edge.to_string(), stream.to_string());
        if let Some(hops) = self.hops.lock().get(&key) {
            return hops.clone();
        }

        // Walk without holding the memo lock; a concurrent walk of the same
        // key produces an identical set, so the first insert is kept.
        let hops = Arc::new(walker::walk(self, edge, stream));
        self.hops.lock().entry(key).or_insert(hops).clone()
    }

    pub fn memoized_streams(&self) -> usize {
        self.hops.lock().len()
    }
}

fn group<'a>(index: &'a GroupIndex, edge: &str, stream: &str) -> std::slice::Iter<'a, usize> {
    index
        .get(edge)
        .and_then(|streams| streams.get(stream))
        .map(|v| v.iter())
        .unwrap_or_default()
}

fn fetch_required(
    source: &dyn TableSource,
    element: &ElementRef,
    kind: TableKind,
    table_id: u32,
    filters: &[String],
) -> Result<Table> {
    let table = source
        .fetch_table(element, table_id, filters)
        .map_err(|e| {
            warn!(
                "[REP] Failed to fetch {} table {} of '{}': {}",
                kind, table_id, element.name, e
            );
            TopologyError::unavailable(&element.name, Unavailable::Fetch(kind, e))
        })?;
    if table.is_empty() {
        return Err(TopologyError::unavailable(&element.name, Unavailable::Empty(kind)));
    }
    Ok(table)
}

fn fetch_bitrates(
    source: &dyn TableSource,
    element: &ElementRef,
    kind: TableKind,
    columns: Option<&StatisticsColumns>,
) -> HashMap<String, f64> {
    let Some(columns) = columns else {
        return HashMap::new();
    };
    let table = match source.fetch_table(element, columns.table_id, &columns.filters) {
        Ok(table) => table,
        Err(e) => {
            warn!(
                "[REP] No {} for '{}', bitrates default to 0: {}",
                kind, element.name, e
            );
            return HashMap::new();
        }
    };

    let mut bitrates = HashMap::with_capacity(table.len());
    for row in 0..table.len() {
        let key = table.text(row, columns.key);
        let value = table.cell(row, columns.bitrate).and_then(|c| c.as_f64());
        if let Some(value) = value
            && !key.is_empty()
        {
            bitrates.insert(key, value);
        }
    }
    bitrates
}

fn parse_edges(table: &Table, columns: &EdgeColumns) -> Vec<Edge> {
    (0..table.len())
        .map(|row| {
            Edge::new(
                table.text(row, columns.id),
                table.text(row, columns.name),
                &table.text(row, columns.address),
            )
        })
        .collect()
}

fn parse_endpoints(
    table: &Table,
    columns: &EndpointColumns,
    kind: EndpointKind,
    bitrates: &HashMap<String, f64>,
) -> Vec<Endpoint> {
    let mut seen = HashSet::with_capacity(table.len());
    let mut endpoints = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let id = table.text(row, columns.id);
        if id.is_empty() {
            debug!("[REP] Skipping {:?} row {} without id", kind, row);
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!("[REP] Duplicate {:?} id '{}', keeping the first row", kind, id);
            continue;
        }

        let status = table.text(row, columns.status);
        let active_flag = columns
            .active
            .map(|col| table.text(row, col))
            .unwrap_or_default();
        endpoints.push(Endpoint {
            name: table.text(row, columns.name),
            kind,
            ip: table.text(row, columns.ip),
            port: table.text(row, columns.port),
            edge: table.text(row, columns.edge),
            stream: table.text(row, columns.stream),
            transport: TransportMode::from_code(kind, &table.text(row, columns.transport)),
            protocol: Protocol::parse(&table.text(row, columns.protocol)),
            active: derive_active(kind, &status, &active_flag),
            status,
            bitrate: bitrates.get(&id).copied().unwrap_or(0.0),
            id,
        });
    }
    endpoints
}
