use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::entity::{Endpoint, EndpointKind, TransportMode};

/// One side of a hop, copied out of the snapshot so hop sets outlive it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopEndpoint {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub port: String,
    pub edge: String,
    pub stream: String,
    pub transport: Option<TransportMode>,
    pub status: String,
    pub bitrate: f64,
}

impl From<&Endpoint> for HopEndpoint {
    fn from(value: &Endpoint) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            ip: value.ip.clone(),
            port: value.port.clone(),
            edge: value.edge.clone(),
            stream: value.stream.clone(),
            transport: Some(value.transport),
            status: value.status.clone(),
            bitrate: value.bitrate,
        }
    }
}

/// A resolved link between two endpoints.
///
/// Identity is the endpoint pair only: two hops with the same source and
/// destination are the same hop, whatever depth they were discovered at. The
/// source kind is part of the pair because input and output ids are separate
/// partitions. A hop with no destination marks a chain that ends there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hop {
    pub source_kind: EndpointKind,
    pub source: HopEndpoint,
    pub destination: HopEndpoint,
    /// 0 for seed hops, positive downstream, negative upstream.
    pub hop_number: i32,
    pub starting_point: bool,
    pub is_active: bool,
}

impl Hop {
    pub fn new(
        source: &Endpoint,
        destination: &Endpoint,
        hop_number: i32,
        is_active: bool,
    ) -> Self {
        Self {
            source_kind: source.kind,
            source: source.into(),
            destination: destination.into(),
            hop_number,
            starting_point: false,
            is_active,
        }
    }

    pub fn seed(input: &Endpoint, output: &Endpoint) -> Self {
        Self {
            starting_point: true,
            ..Self::new(input, output, 0, input.active)
        }
    }

    pub fn dangling(source: &Endpoint, hop_number: i32, is_active: bool) -> Self {
        Self {
            source_kind: source.kind,
            source: source.into(),
            destination: HopEndpoint::default(),
            hop_number,
            starting_point: false,
            is_active,
        }
    }

    pub fn is_dangling(&self) -> bool {
        self.destination.id.is_empty()
    }

    pub fn identity(&self) -> (EndpointKind, &str, &str) {
        (self.source_kind, &self.source.id, &self.destination.id)
    }
}

impl PartialEq for Hop {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Hop {}

impl Hash for Hop {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::entity::Protocol;

    fn endpoint(kind: EndpointKind, id: &str) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            name: format!("{kind}-{id}"),
            kind,
            ip: "10.0.0.1".to_string(),
            port: "5000".to_string(),
            edge: "EdgeA".to_string(),
            stream: "Live1".to_string(),
            transport: TransportMode::Push,
            protocol: Protocol::Other("srt".to_string()),
            status: "False".to_string(),
            active: true,
            bitrate: 12.5,
        }
    }

    #[test]
    fn test_identity_ignores_depth_and_flags() {
        let input = endpoint(EndpointKind::Input, "1");
        let output = endpoint(EndpointKind::Output, "2");
        let mut set = HashSet::new();
        assert!(set.insert(Hop::new(&input, &output, 3, true)));
        assert!(!set.insert(Hop::new(&input, &output, -2, false)));
        assert_eq!(set.iter().next().map(|h| h.hop_number), Some(3));
    }

    #[test]
    fn test_identity_separates_kinds() {
        let input = endpoint(EndpointKind::Input, "1");
        let output = endpoint(EndpointKind::Output, "1");
        let forward = Hop::new(&input, &output, 0, true);
        let backward = Hop::new(&output, &input, 1, true);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_seed_and_dangling() {
        let input = endpoint(EndpointKind::Input, "1");
        let output = endpoint(EndpointKind::Output, "2");
        let seed = Hop::seed(&input, &output);
        assert!(seed.starting_point);
        assert_eq!(seed.hop_number, 0);

        let end = Hop::dangling(&output, 1, true);
        assert!(end.is_dangling());
        assert_eq!(end.destination.bitrate, 0.0);
        assert_eq!(end.destination.transport, None);
        assert_eq!(end.source.bitrate, 12.5);
    }
}
