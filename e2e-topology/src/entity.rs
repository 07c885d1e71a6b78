use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Port value marking an output as disabled.
pub const DISABLED_PORT: &str = "-1";

const REDUNDANCY_PROTOCOL: &str = "2022-7";
const HLS_PROTOCOL: &str = "hls";

#[derive(
    Debug,
    Hash,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
pub enum EndpointKind {
    #[strum(serialize = "Source")]
    Input,
    #[strum(serialize = "Output")]
    Output,
}

/// Which side opens the connection.
#[derive(
    Debug,
    Hash,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum TransportMode {
    /// The output dials its destination.
    Push,
    /// The endpoint waits to be dialed.
    Listener,
    /// The input dials its source.
    Pull,
}

impl TransportMode {
    /// Decode the device's numeric mode code. The meaning of a code depends on
    /// the table it comes from: outputs use `0` for listener and anything else
    /// for push, inputs use `1` for listener and anything else for pull.
    pub fn from_code(kind: EndpointKind, code: &str) -> Self {
        match (kind, code.trim()) {
            (EndpointKind::Output, "0") => TransportMode::Listener,
            (EndpointKind::Output, _) => TransportMode::Push,
            (EndpointKind::Input, "1") => TransportMode::Listener,
            (EndpointKind::Input, _) => TransportMode::Pull,
        }
    }
}

#[derive(Debug, Hash, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// SMPTE 2022-7 seamless redundancy leg; never chained.
    Redundancy,
    Hls,
    Other(String),
}

impl Protocol {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == REDUNDANCY_PROTOCOL {
            Protocol::Redundancy
        } else if raw.eq_ignore_ascii_case(HLS_PROTOCOL) {
            Protocol::Hls
        } else {
            Protocol::Other(raw.to_string())
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Redundancy => write!(f, "{REDUNDANCY_PROTOCOL}"),
            Protocol::Hls => write!(f, "{HLS_PROTOCOL}"),
            Protocol::Other(x) => write!(f, "{x}"),
        }
    }
}

/// Endpoint identity: ids are only unique within their kind.
pub type EndpointKey = (EndpointKind, String);

/// One input or output port of the managed device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub kind: EndpointKind,
    pub ip: String,
    pub port: String,
    pub edge: String,
    pub stream: String,
    pub transport: TransportMode,
    pub protocol: Protocol,
    /// Raw status cell, kept for display.
    pub status: String,
    pub active: bool,
    pub bitrate: f64,
}

impl Endpoint {
    pub fn key(&self) -> EndpointKey {
        (self.kind, self.id.clone())
    }

    pub fn is_disabled(&self) -> bool {
        self.port == DISABLED_PORT
    }

    pub fn is_redundancy_leg(&self) -> bool {
        self.protocol == Protocol::Redundancy
    }

    /// Whether the endpoint may seed or extend a walk for its kind: inputs
    /// carrying a redundancy leg and disabled outputs are left out.
    pub fn is_walkable(&self) -> bool {
        match self.kind {
            EndpointKind::Input => !self.is_redundancy_leg(),
            EndpointKind::Output => !self.is_disabled(),
        }
    }
}

/// Output activity is reported inverted by the device: a status of `False`
/// means the output is running. Inputs carry a dedicated flag where `True`
/// means active.
pub fn derive_active(kind: EndpointKind, status: &str, active_flag: &str) -> bool {
    match kind {
        EndpointKind::Output => status.trim() == "False",
        EndpointKind::Input => active_flag.trim() == "True",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeAddress {
    pub ip: String,
    pub port: Option<String>,
}

impl EdgeAddress {
    /// Parse `ip`, `ip:port` or `[v6]:port`.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if let Some(rest) = entry.strip_prefix('[') {
            let (ip, tail) = rest.split_once(']')?;
            let port = tail.strip_prefix(':').filter(|p| !p.is_empty());
            return Some(Self {
                ip: ip.to_string(),
                port: port.map(str::to_string),
            });
        }
        match entry.split_once(':') {
            // a bare IPv6 address has more than one colon
            Some((ip, port)) if !port.contains(':') => Some(Self {
                ip: ip.to_string(),
                port: (!port.is_empty()).then(|| port.to_string()),
            }),
            _ => Some(Self {
                ip: entry.to_string(),
                port: None,
            }),
        }
    }
}

/// A logical site whose address pool endpoints may share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub name: String,
    pub addresses: Vec<EdgeAddress>,
}

impl Edge {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address_list: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            addresses: address_list.split(';').filter_map(EdgeAddress::parse).collect(),
        }
    }

    /// Exact IP equality against any entry of the address list.
    pub fn contains_ip(&self, ip: &str) -> bool {
        let ip = ip.trim();
        !ip.is_empty() && self.addresses.iter().any(|a| a.ip == ip)
    }
}
