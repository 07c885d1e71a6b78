//! Bounded bidirectional walk reconstructing the hop chain of one
//! `(edge, stream)` pair.
//!
//! The walk is seeded with every walkable input and output of the pair, then
//! extends downstream (output → input → output …) and upstream
//! (input → output → input …) one depth level per iteration. Matching rules
//! can form cycles on misconfigured devices, so each direction stops after
//! `max_depth` levels. Endpoints are expanded at most once per direction and
//! a walk never re-enters its own seed endpoints.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::{
    entity::{Endpoint, EndpointKey},
    hop::Hop,
    matcher,
    repository::{HopSet, Repository},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// Hops of one walk and the directions the depth bound cut short.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub hops: HopSet,
    pub truncated: Vec<Direction>,
}

pub struct Walker<'a> {
    repo: &'a Repository,
    edge: &'a str,
    stream: &'a str,
    seeds: HashSet<EndpointKey>,
    hops: HopSet,
    truncated: Vec<Direction>,
}

fn hop_number(depth: usize) -> i32 {
    i32::try_from(depth + 1).unwrap_or(i32::MAX)
}

impl<'a> Walker<'a> {
    pub fn new(repo: &'a Repository, edge: &'a str, stream: &'a str) -> Self {
        Self {
            repo,
            edge,
            stream,
            seeds: HashSet::new(),
            hops: HopSet::new(),
            truncated: Vec::new(),
        }
    }

    pub fn run(mut self) -> WalkOutcome {
        let inputs: Vec<&'a Endpoint> = self
            .repo
            .inputs_in(self.edge, self.stream)
            .filter(|e| e.is_walkable())
            .collect();
        let outputs: Vec<&'a Endpoint> = self
            .repo
            .outputs_in(self.edge, self.stream)
            .filter(|e| e.is_walkable())
            .collect();

        self.seeds = inputs.iter().chain(outputs.iter()).map(|e| e.key()).collect();
        for input in &inputs {
            for output in &outputs {
                self.hops.insert(Hop::seed(input, output));
            }
        }
        trace!(
            "[WLK] Seeded {}/{}: inputs={} outputs={}",
            self.edge,
            self.stream,
            inputs.len(),
            outputs.len()
        );

        self.forward(outputs);
        self.backward(inputs);

        debug!(
            "[WLK] Resolved {}/{} on '{}': {} hops",
            self.edge,
            self.stream,
            self.repo.element(),
            self.hops.len()
        );
        WalkOutcome {
            hops: self.hops,
            truncated: self.truncated,
        }
    }

    fn is_seed(&self, endpoint: &Endpoint) -> bool {
        self.seeds.contains(&endpoint.key())
    }

    fn depth_limit_reached(&mut self, direction: Direction, pending: usize) {
        self.truncated.push(direction);
        debug!(
            "[WLK] Depth limit {} reached walking {} from {}/{} on '{}', {} endpoints left unexplored",
            self.repo.max_depth(),
            direction,
            self.edge,
            self.stream,
            self.repo.element(),
            pending
        );
    }

    /// Downstream: outputs dial or serve inputs, inputs re-emit on outputs of
    /// their own edge. Hop numbers are `depth + 1`.
    fn forward(&mut self, mut frontier: Vec<&'a Endpoint>) {
        let mut visited = self.seeds.clone();
        let mut depth = 0;
        while !frontier.is_empty() {
            if depth > self.repo.max_depth() {
                self.depth_limit_reached(Direction::Forward, frontier.len());
                break;
            }
            let number = hop_number(depth);

            let mut next_inputs = Vec::new();
            for output in frontier {
                let matches = matcher::forward_inputs(output, self.repo);
                if matches.is_empty() {
                    self.hops.insert(Hop::dangling(output, number, output.active));
                    continue;
                }
                for input in matches {
                    if self.is_seed(input) {
                        continue;
                    }
                    self.hops.insert(Hop::new(output, input, number, output.active));
                    if visited.insert(input.key()) {
                        next_inputs.push(input);
                    }
                }
            }

            let mut next_outputs = Vec::new();
            for input in next_inputs {
                for output in matcher::forward_outputs(input, self.repo) {
                    if self.is_seed(output) {
                        continue;
                    }
                    self.hops.insert(Hop::new(input, output, number, input.active));
                    if visited.insert(output.key()) {
                        next_outputs.push(output);
                    }
                }
            }

            frontier = next_outputs;
            depth += 1;
        }
    }

    /// Upstream: inputs are fed by outputs, outputs are fed by inputs of their
    /// own edge. Hop numbers are `-depth - 1`.
    fn backward(&mut self, mut frontier: Vec<&'a Endpoint>) {
        let mut visited = self.seeds.clone();
        let mut depth = 0;
        while !frontier.is_empty() {
            if depth > self.repo.max_depth() {
                self.depth_limit_reached(Direction::Backward, frontier.len());
                break;
            }
            let number = -hop_number(depth);

            let mut previous_outputs = Vec::new();
            for input in frontier {
                for output in matcher::backward_outputs(input, self.repo) {
                    if self.is_seed(output) {
                        continue;
                    }
                    self.hops.insert(Hop::new(output, input, number, output.active));
                    if visited.insert(output.key()) {
                        previous_outputs.push(output);
                    }
                }
            }

            let mut previous_inputs = Vec::new();
            for output in previous_outputs {
                for input in matcher::backward_inputs(output, self.repo) {
                    if self.is_seed(input) {
                        continue;
                    }
                    self.hops.insert(Hop::new(input, output, number, input.active));
                    if visited.insert(input.key()) {
                        previous_inputs.push(input);
                    }
                }
            }

            frontier = previous_inputs;
            depth += 1;
        }
    }
}

/// Resolve every hop reachable from `(edge, stream)` in `repo`.
pub fn walk(repo: &Repository, edge: &str, stream: &str) -> HopSet {
    Walker::new(repo, edge, stream).run().hops
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::entity::{EndpointKind, Protocol, TransportMode};

    fn endpoint(
        kind: EndpointKind,
        id: &str,
        edge: &str,
        stream: &str,
        ip: &str,
        port: &str,
    ) -> Endpoint {
        let transport = match kind {
            EndpointKind::Input => TransportMode::Listener,
            EndpointKind::Output => TransportMode::Push,
        };
        Endpoint {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            ip: ip.to_string(),
            port: port.to_string(),
            edge: edge.to_string(),
            stream: stream.to_string(),
            transport,
            protocol: Protocol::Other("srt".to_string()),
            status: "False".to_string(),
            active: true,
            bitrate: 0.0,
        }
    }

    /// Edges `E0..En`, each with one input and one output on stream `S`;
    /// output `k` pushes to the input of edge `k + 1`.
    fn chain(len: usize) -> (Vec<Endpoint>, Vec<Endpoint>) {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for k in 0..len {
            let edge = format!("E{k}");
            let (id_in, ip_in) = (format!("i{k}"), format!("10.0.{k}.1"));
            let (id_out, ip_out) = (format!("o{k}"), format!("10.0.{}.1", k + 1));
            inputs.push(endpoint(EndpointKind::Input, &id_in, &edge, "S", &ip_in, "5000"));
            outputs.push(endpoint(EndpointKind::Output, &id_out, &edge, "S", &ip_out, "5000"));
        }
        (inputs, outputs)
    }

    fn by_pair(hops: &HopSet) -> HashMap<(String, String), i32> {
        hops.iter()
            .map(|h| ((h.source.id.clone(), h.destination.id.clone()), h.hop_number))
            .collect()
    }

    #[test]
    fn test_seed_only_loopback() {
        let repo = Repository::new(
            "el",
            vec![],
            vec![endpoint(EndpointKind::Input, "in1", "EdgeA", "Live1", "10.0.0.1", "5000")],
            vec![endpoint(EndpointKind::Output, "out1", "EdgeA", "Live1", "10.0.0.1", "5000")],
        );
        let hops = walk(&repo, "EdgeA", "Live1");
        assert_eq!(hops.len(), 1);
        let hop = hops.iter().next().expect("one hop");
        assert_eq!((hop.source.id.as_str(), hop.destination.id.as_str()), ("in1", "out1"));
        assert_eq!(hop.hop_number, 0);
        assert!(hop.starting_point);
    }

    #[test]
    fn test_unmatched_push_ends_in_dangling_hop() {
        let repo = Repository::new(
            "el",
            vec![],
            vec![endpoint(EndpointKind::Input, "in1", "EdgeA", "Live1", "10.0.0.1", "4000")],
            vec![endpoint(EndpointKind::Output, "out1", "EdgeA", "Live1", "10.9.9.9", "6000")],
        );
        let hops = walk(&repo, "EdgeA", "Live1");
        let dangling: Vec<&Hop> = hops.iter().filter(|h| h.is_dangling()).collect();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].hop_number, 1);
        assert_eq!(dangling[0].source.id, "out1");
        assert_eq!(dangling[0].destination.bitrate, 0.0);
        assert_eq!(hops.len(), 2);
    }

    #[test]
    fn test_chain_numbers_both_directions() {
        let (inputs, outputs) = chain(5);
        let repo = Repository::new("el", vec![], inputs, outputs);
        let hops = by_pair(&walk(&repo, "E2", "S"));

        assert_eq!(hops.get(&("i2".into(), "o2".into())), Some(&0));
        assert_eq!(hops.get(&("o2".into(), "i3".into())), Some(&1));
        assert_eq!(hops.get(&("i3".into(), "o3".into())), Some(&1));
        assert_eq!(hops.get(&("o3".into(), "i4".into())), Some(&2));
        assert_eq!(hops.get(&("o4".into(), "".into())), Some(&3));
        assert_eq!(hops.get(&("o1".into(), "i2".into())), Some(&-1));
        assert_eq!(hops.get(&("i1".into(), "o1".into())), Some(&-1));
        assert_eq!(hops.get(&("o0".into(), "i1".into())), Some(&-2));
        assert_eq!(hops.get(&("i0".into(), "o0".into())), Some(&-2));
        assert_eq!(hops.len(), 10);
    }

    #[test]
    fn test_depth_bound() {
        let (inputs, outputs) = chain(30);
        let repo = Repository::new("el", vec![], inputs, outputs).with_max_depth(10);
        let hops = walk(&repo, "E0", "S");
        let max = hops.iter().map(|h| h.hop_number).max();
        assert_eq!(max, Some(11));
        assert!(hops.iter().all(|h| h.hop_number >= 0));
        assert!(!hops.iter().any(|h| h.is_dangling()));
    }

    #[test]
    fn test_depth_limit_reported() {
        let (inputs, outputs) = chain(30);
        let repo = Repository::new("el", vec![], inputs, outputs).with_max_depth(10);
        let outcome = Walker::new(&repo, "E0", "S").run();
        assert_eq!(outcome.truncated, vec![Direction::Forward]);

        let (inputs, outputs) = chain(3);
        let repo = Repository::new("el", vec![], inputs, outputs).with_max_depth(10);
        let outcome = Walker::new(&repo, "E0", "S").run();
        assert!(outcome.truncated.is_empty());
        assert_eq!(outcome.hops.len(), 6);
    }

    #[test]
    fn test_hop_number_saturates() {
        assert_eq!(hop_number(0), 1);
        assert_eq!(hop_number(usize::MAX - 1), i32::MAX);
    }

    #[test]
    fn test_cycle_terminates_without_duplicates() {
        // ob pushes into I; I re-emits on O; O pushes back into I.
        let repo = Repository::new(
            "el",
            vec![],
            vec![
                endpoint(EndpointKind::Input, "ib", "EdgeB", "T", "10.7.7.7", "1"),
                endpoint(EndpointKind::Input, "I", "EdgeA", "S", "10.0.0.1", "5000"),
            ],
            vec![
                endpoint(EndpointKind::Output, "ob", "EdgeB", "T", "10.0.0.1", "5000"),
                endpoint(EndpointKind::Output, "O", "EdgeA", "S", "10.0.0.1", "5000"),
            ],
        );
        let hops = walk(&repo, "EdgeB", "T");
        let pairs = by_pair(&hops);
        assert_eq!(pairs.get(&("ob".into(), "I".into())), Some(&1));
        assert_eq!(pairs.get(&("I".into(), "O".into())), Some(&1));
        assert_eq!(pairs.get(&("O".into(), "I".into())), Some(&2));
        assert_eq!(
            hops.iter().filter(|h| h.source.id == "O" && h.destination.id == "I").count(),
            1
        );
        assert_eq!(hops.len(), 4);
    }

    #[test]
    fn test_disabled_outputs_never_destinations() {
        let (mut inputs, mut outputs) = chain(3);
        outputs.push(endpoint(EndpointKind::Output, "off", "E1", "S", "10.0.9.1", "-1"));
        inputs.push(endpoint(EndpointKind::Input, "sink", "E5", "S", "10.0.9.1", "-1"));
        let repo = Repository::new("el", vec![], inputs, outputs);
        let hops = walk(&repo, "E0", "S");
        assert!(hops.iter().all(|h| h.destination.port != "-1"));
        assert!(hops.iter().all(|h| h.source.id != "off"));
    }

    #[test]
    fn test_redundancy_inputs_do_not_seed() {
        let mut redundant =
            endpoint(EndpointKind::Input, "leg2", "EdgeA", "Live1", "10.3.3.3", "1");
        redundant.protocol = Protocol::Redundancy;
        let repo = Repository::new(
            "el",
            vec![],
            vec![
                endpoint(EndpointKind::Input, "leg1", "EdgeA", "Live1", "10.2.2.2", "1"),
                redundant,
            ],
            vec![endpoint(EndpointKind::Output, "out", "EdgeA", "Live1", "10.0.0.1", "1")],
        );
        let hops = walk(&repo, "EdgeA", "Live1");
        let seeds: Vec<&Hop> = hops.iter().filter(|h| h.starting_point).collect();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].source.id, "leg1");
    }

    #[test]
    fn test_order_independent() {
        let (inputs, outputs) = chain(6);
        let forward = Repository::new("el", vec![], inputs.clone(), outputs.clone());
        let reversed = Repository::new(
            "el",
            vec![],
            inputs.into_iter().rev().collect(),
            outputs.into_iter().rev().collect(),
        );
        assert_eq!(
            by_pair(&walk(&forward, "E3", "S")),
            by_pair(&walk(&reversed, "E3", "S"))
        );
    }
}
