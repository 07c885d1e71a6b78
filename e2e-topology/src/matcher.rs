//! Connection rules between outputs and inputs.
//!
//! Two endpoints connect when their IP and port match directly, or when the
//! port matches and the dialed IP belongs to the address pool of the edge on
//! the listening side. Which edge counts as the listening side follows from
//! the transport mode of the endpoint being matched.
//!
//! Every function here is pure over a [`Repository`].

use crate::{
    entity::{Endpoint, Protocol, TransportMode},
    repository::Repository,
};

/// Whether `ip` belongs to the address pool of the edge named `edge`.
pub fn edge_contains_ip(repo: &Repository, edge: &str, ip: &str) -> bool {
    repo.edge(edge).is_some_and(|e| e.contains_ip(ip))
}

/// `dialed` is the IP being dialed, `pool_edge` the edge expected to own it.
fn connects(
    repo: &Repository,
    output: &Endpoint,
    input: &Endpoint,
    pool_edge: &str,
    dialed: &str,
) -> bool {
    input.port == output.port
        && (input.ip == output.ip || edge_contains_ip(repo, pool_edge, dialed))
}

/// Downstream inputs an output feeds.
///
/// A push output dials its destination, so the output IP is looked up in the
/// input's edge. A listener output (and any HLS output, which is always
/// fetched by the consumer) is dialed by the input, so the input IP is looked
/// up in the output's edge.
pub fn forward_inputs<'a>(output: &Endpoint, repo: &'a Repository) -> Vec<&'a Endpoint> {
    let pushes = output.transport == TransportMode::Push && output.protocol != Protocol::Hls;
    repo.inputs()
        .iter()
        .filter(|input| {
            if pushes {
                connects(repo, output, input, &input.edge, &output.ip)
            } else {
                connects(repo, output, input, &output.edge, &input.ip)
            }
        })
        .collect()
}

/// Upstream outputs feeding an input. Disabled outputs are never returned.
///
/// A listener input is dialed by the output, so the output IP is looked up in
/// the input's edge. A pulling input dials the output, so the input IP is
/// looked up in the output's edge.
pub fn backward_outputs<'a>(input: &Endpoint, repo: &'a Repository) -> Vec<&'a Endpoint> {
    let listens = input.transport == TransportMode::Listener;
    repo.outputs()
        .iter()
        .filter(|output| !output.is_disabled())
        .filter(|output| {
            if listens {
                connects(repo, output, input, &input.edge, &output.ip)
            } else {
                connects(repo, output, input, &output.edge, &input.ip)
            }
        })
        .collect()
}

/// Outputs re-emitting an input's stream on the same edge. Disabled outputs
/// are skipped.
pub fn forward_outputs<'a>(input: &Endpoint, repo: &'a Repository) -> Vec<&'a Endpoint> {
    repo.outputs_in(&input.edge, &input.stream)
        .filter(|output| !output.is_disabled())
        .collect()
}

/// Inputs carrying an output's stream on the same edge. Redundancy legs are
/// not chained.
pub fn backward_inputs<'a>(output: &Endpoint, repo: &'a Repository) -> Vec<&'a Endpoint> {
    repo.inputs_in(&output.edge, &output.stream)
        .filter(|input| !input.is_redundancy_leg())
        .collect()
}
