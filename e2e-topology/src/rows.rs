//! Flat row rendering of a hop set, one row per hop, as consumed by table and
//! node-edge views.

use serde::Serialize;

use crate::{
    entity::EndpointKind,
    hop::{Hop, HopEndpoint},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopRow {
    #[serde(rename = "IO ID SRC")]
    pub id_src: String,
    #[serde(rename = "IO Name SRC")]
    pub name_src: String,
    #[serde(rename = "IO SRC")]
    pub kind_src: String,
    #[serde(rename = "IO State SRC")]
    pub state_src: String,
    #[serde(rename = "IO Type SRC")]
    pub type_src: String,
    #[serde(rename = "Bitrate SRC")]
    pub bitrate_src: f64,
    #[serde(rename = "Stream Name SRC")]
    pub stream_src: String,
    #[serde(rename = "Edge Name SRC")]
    pub edge_src: String,
    #[serde(rename = "IO ID DST")]
    pub id_dst: String,
    #[serde(rename = "IO Name DST")]
    pub name_dst: String,
    #[serde(rename = "IO State DST")]
    pub state_dst: String,
    #[serde(rename = "IO Type DST")]
    pub type_dst: String,
    #[serde(rename = "Bitrate DST")]
    pub bitrate_dst: f64,
    #[serde(rename = "Stream Name DST")]
    pub stream_dst: String,
    #[serde(rename = "Edge Name DST")]
    pub edge_dst: String,
    #[serde(rename = "Starting Point")]
    pub starting_point: bool,
    #[serde(rename = "Hop")]
    pub hop: i32,
    #[serde(rename = "Active")]
    pub active: bool,
}

pub const COLUMNS: [&str; 18] = [
    "IO ID SRC",
    "IO Name SRC",
    "IO SRC",
    "IO State SRC",
    "IO Type SRC",
    "Bitrate SRC",
    "Stream Name SRC",
    "Edge Name SRC",
    "IO ID DST",
    "IO Name DST",
    "IO State DST",
    "IO Type DST",
    "Bitrate DST",
    "Stream Name DST",
    "Edge Name DST",
    "Starting Point",
    "Hop",
    "Active",
];

fn transport(endpoint: &HopEndpoint) -> String {
    endpoint.transport.map(|t| t.to_string()).unwrap_or_default()
}

impl HopRow {
    fn from_hop(hop: &Hop) -> Self {
        let (src, dst) = (&hop.source, &hop.destination);
        Self {
            id_src: src.id.clone(),
            name_src: src.name.clone(),
            kind_src: hop.source_kind.to_string(),
            state_src: src.status.clone(),
            type_src: transport(src),
            bitrate_src: src.bitrate,
            stream_src: src.stream.clone(),
            edge_src: src.edge.clone(),
            id_dst: dst.id.clone(),
            name_dst: dst.name.clone(),
            state_dst: dst.status.clone(),
            type_dst: transport(dst),
            bitrate_dst: dst.bitrate,
            stream_dst: dst.stream.clone(),
            edge_dst: dst.edge.clone(),
            starting_point: hop.starting_point
                || (hop.hop_number == 1 && hop.source_kind == EndpointKind::Output),
            hop: hop.hop_number,
            active: hop.is_active,
        }
    }

    /// The destination of a final input hop drawn as a node of its own.
    fn terminal(hop: &Hop) -> Self {
        let dst = &hop.destination;
        Self {
            id_src: dst.id.clone(),
            name_src: dst.name.clone(),
            kind_src: EndpointKind::Output.to_string(),
            state_src: dst.status.clone(),
            type_src: transport(dst),
            bitrate_src: dst.bitrate,
            stream_src: dst.stream.clone(),
            edge_src: dst.edge.clone(),
            id_dst: String::new(),
            name_dst: String::new(),
            state_dst: String::new(),
            type_dst: String::new(),
            bitrate_dst: 0.0,
            stream_dst: String::new(),
            edge_dst: String::new(),
            starting_point: hop.starting_point,
            hop: hop.hop_number,
            active: hop.is_active,
        }
    }

    /// Cell values in [`COLUMNS`] order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.id_src.clone(),
            self.name_src.clone(),
            self.kind_src.clone(),
            self.state_src.clone(),
            self.type_src.clone(),
            self.bitrate_src.to_string(),
            self.stream_src.clone(),
            self.edge_src.clone(),
            self.id_dst.clone(),
            self.name_dst.clone(),
            self.state_dst.clone(),
            self.type_dst.clone(),
            self.bitrate_dst.to_string(),
            self.stream_dst.clone(),
            self.edge_dst.clone(),
            self.starting_point.to_string(),
            self.hop.to_string(),
            self.active.to_string(),
        ]
    }
}

/// Render `hops` as rows ordered by hop number, source id and destination
/// id, followed by one terminal row per input hop at the highest hop number.
pub fn render<'a>(hops: impl IntoIterator<Item = &'a Hop>) -> Vec<HopRow> {
    let mut hops: Vec<&Hop> = hops.into_iter().collect();
    hops.sort_by(|a, b| {
        a.hop_number
            .cmp(&b.hop_number)
            .then_with(|| a.source.id.cmp(&b.source.id))
            .then_with(|| a.destination.id.cmp(&b.destination.id))
    });

    let mut rows: Vec<HopRow> = hops.iter().map(|h| HopRow::from_hop(h)).collect();
    if let Some(last) = hops.iter().map(|h| h.hop_number).max() {
        rows.extend(
            hops.iter()
                .filter(|h| h.source_kind == EndpointKind::Input && h.hop_number == last)
                .map(|h| HopRow::terminal(h)),
        );
    }
    rows
}
