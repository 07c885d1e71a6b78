use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use e2e_topology::{
    Builder, CellValue, ElementFilter, ElementRef, ManualClock, SourceError, Table, TableId,
    TableLayout, TableSource, TopologyConfig, TopologyResolver,
};

const INPUT_WIDTH: usize = 32;
const OUTPUT_WIDTH: usize = 16;
const EDGE_WIDTH: usize = 10;

/// In-memory device tables keyed by element name, laid out with the current
/// firmware columns.
#[derive(Default)]
pub struct FakeSource {
    elements: Mutex<BTreeMap<String, HashMap<TableId, Table>>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(
        &self,
        name: &str,
        edges: Vec<Vec<CellValue>>,
        inputs: Vec<Vec<CellValue>>,
        outputs: Vec<Vec<CellValue>>,
    ) {
        let layout = TableLayout::current();
        let mut tables = HashMap::new();
        tables.insert(layout.edges.table_id, Table::new(edges));
        tables.insert(layout.inputs.table_id, Table::new(inputs));
        tables.insert(layout.outputs.table_id, Table::new(outputs));
        self.elements.lock().unwrap().insert(name.to_string(), tables);
    }

    /// Drop one table of an element so its snapshot can no longer be built.
    pub fn remove_table(&self, name: &str, table_id: TableId) {
        if let Some(tables) = self.elements.lock().unwrap().get_mut(name) {
            tables.remove(&table_id);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl TableSource for FakeSource {
    fn find_element_by_name(&self, name: &str) -> Result<ElementRef, SourceError> {
        let elements = self.elements.lock().unwrap();
        elements
            .keys()
            .position(|n| n == name)
            .map(|i| ElementRef::new(1, i as i32 + 1, name))
            .ok_or_else(|| SourceError::ElementNotFound(name.to_string()))
    }

    fn list_elements_by_type(
        &self,
        _filter: &ElementFilter,
    ) -> Result<Vec<ElementRef>, SourceError> {
        let elements = self.elements.lock().unwrap();
        Ok(elements
            .keys()
            .enumerate()
            .map(|(i, name)| ElementRef::new(1, i as i32 + 1, name.as_str()))
            .collect())
    }

    fn fetch_table(
        &self,
        element: &ElementRef,
        table_id: TableId,
        _filters: &[String],
    ) -> Result<Table, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Transport("timed out".to_string()));
        }
        self.elements
            .lock()
            .unwrap()
            .get(&element.name)
            .and_then(|tables| tables.get(&table_id))
            .cloned()
            .ok_or(SourceError::TableNotFound(table_id))
    }
}

fn row(width: usize, cells: &[(usize, &str)]) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; width];
    for (col, value) in cells {
        row[*col] = CellValue::from(*value);
    }
    row
}

#[allow(dead_code)]
pub fn edge(id: &str, name: &str, addresses: &str) -> Vec<CellValue> {
    row(EDGE_WIDTH, &[(0, id), (1, name), (9, addresses)])
}

/// An input row. `listener` selects transport code 1, otherwise the input
/// pulls.
#[allow(dead_code)]
pub fn input(
    id: &str,
    edge: &str,
    stream: &str,
    ip: &str,
    port: &str,
    listener: bool,
) -> Vec<CellValue> {
    input_with_protocol(id, edge, stream, ip, port, listener, "srt")
}

#[allow(dead_code)]
pub fn input_with_protocol(
    id: &str,
    edge: &str,
    stream: &str,
    ip: &str,
    port: &str,
    listener: bool,
    protocol: &str,
) -> Vec<CellValue> {
    let mut row = row(
        INPUT_WIDTH,
        &[
            (0, id),
            (1, id),
            (3, protocol),
            (5, if listener { "1" } else { "2" }),
            (7, port),
            (20, "Ok"),
            (23, stream),
            (30, ip),
            (31, edge),
        ],
    );
    row[27] = CellValue::Bool(true);
    row
}

/// An output row. `push` selects transport code 1, otherwise the output
/// listens.
#[allow(dead_code)]
pub fn output(
    id: &str,
    edge: &str,
    stream: &str,
    ip: &str,
    port: &str,
    push: bool,
) -> Vec<CellValue> {
    let mut row = row(
        OUTPUT_WIDTH,
        &[
            (0, id),
            (1, id),
            (3, "srt"),
            (4, ip),
            (5, port),
            (9, stream),
            (10, edge),
            (15, if push { "1" } else { "0" }),
        ],
    );
    row[2] = CellValue::Bool(false);
    row
}

/// Four edges in a chain on stream `Live1`:
///
/// ```text
/// in_z -> out_z ==> in_a -> out_a ==> in_b -> out_b ==> in_c -> out_c ==> (nothing)
///  EdgeZ/Contrib     EdgeA/Live1       EdgeB/Live1       EdgeC/Live1
/// ```
///
/// `out_z` reaches `in_a` through EdgeA's address pool, `out_a` reaches `in_b`
/// through EdgeB's pool, and `in_c` dials the listening `out_b` through
/// EdgeB's pool. EdgeB also carries a disabled output whose port would match
/// `in_d`.
#[allow(dead_code)]
pub fn chain_tables() -> (Vec<Vec<CellValue>>, Vec<Vec<CellValue>>, Vec<Vec<CellValue>>) {
    let edges = vec![
        edge("1", "EdgeA", "10.0.0.1:5000;10.0.0.2:5000"),
        edge("2", "EdgeB", "10.1.0.1:6000"),
        edge("3", "EdgeC", "10.2.0.1"),
        edge("4", "EdgeZ", "192.0.2.1"),
    ];
    let inputs = vec![
        input("in_z", "EdgeZ", "Contrib", "192.0.2.1", "4000", true),
        input("in_a", "EdgeA", "Live1", "10.0.0.1", "5000", true),
        input("in_b", "EdgeB", "Live1", "0.0.0.0", "6000", true),
        input("in_c", "EdgeC", "Live1", "10.1.0.1", "7000", false),
        input("in_d", "EdgeC", "Spare", "10.2.0.1", "-1", true),
    ];
    let outputs = vec![
        output("out_z", "EdgeZ", "Contrib", "10.0.0.2", "5000", true),
        output("out_a", "EdgeA", "Live1", "10.1.0.1", "6000", true),
        output("out_b", "EdgeB", "Live1", "0.0.0.0", "7000", false),
        output("out_b2", "EdgeB", "Live1", "10.2.0.1", "-1", true),
        output("out_c", "EdgeC", "Live1", "203.0.113.5", "9000", true),
    ];
    (edges, inputs, outputs)
}

#[allow(dead_code)]
pub fn chain_source() -> Arc<FakeSource> {
    let source = Arc::new(FakeSource::new());
    let (edges, inputs, outputs) = chain_tables();
    source.add_element("mwcore-1", edges, inputs, outputs);
    source
}

#[allow(dead_code)]
pub fn resolver(source: Arc<FakeSource>) -> TopologyResolver {
    TopologyResolver::builder(source)
        .with_config(TopologyConfig::default())
        .build()
        .expect("Failed to build resolver")
}

#[allow(dead_code)]
pub fn resolver_with_clock(source: Arc<FakeSource>, clock: Arc<ManualClock>) -> TopologyResolver {
    TopologyResolver::builder(source)
        .with_config(TopologyConfig::default())
        .with_clock(clock)
        .build()
        .expect("Failed to build resolver")
}
