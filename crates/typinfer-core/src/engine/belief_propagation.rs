//! Loopy belief propagation over parameter nodes.
//!
//! One message round walks a fresh random permutation of the nodes. Each sender
//! `i` aggregates its own belief with every message queued at `i` except the one
//! from the receiver `j`, pushes the aggregate through the potential `i → j`,
//! and queues the normalized result at `j`, replacing any unconsumed message
//! from `i`. Because messages queued earlier in the same round are visible to
//! later senders, the schedule is asynchronous and the random path shapes the
//! trajectory.
//!
//! Consolidation then multiplies each unlocked node's belief by all of its
//! queued messages and clears the inbox.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::engine::belief::normalize_or_uniform;
use crate::engine::node::{NodeIndex, ParameterNode};
use crate::engine::potential::Potential;

/// Outgoing edges per node, keyed by receiver.
pub(crate) type OutgoingEdges = Vec<BTreeMap<NodeIndex, Potential>>;

/// Draws a fresh propagation path: a random permutation of node indices.
pub(crate) fn propagation_path<R: Rng + ?Sized>(node_count: usize, rng: &mut R) -> Vec<NodeIndex> {
    let mut path: Vec<NodeIndex> = (0..node_count as u32).map(NodeIndex).collect();
    path.shuffle(rng);
    path
}

/// Runs one message round. Returns the number of messages sent.
pub(crate) fn run_message_round<R: Rng + ?Sized>(
    nodes: &mut [ParameterNode],
    edges: &OutgoingEdges,
    rng: &mut R,
) -> usize {
    let mut sent = 0;
    for sender in propagation_path(nodes.len(), rng) {
        for (&receiver, potential) in &edges[sender.slot()] {
            let aggregate = nodes[sender.slot()].aggregated_belief(receiver);
            let message = compute_message(&aggregate, potential);
            nodes[receiver.slot()].receive_message(sender, message);
            sent += 1;
        }
    }
    sent
}

/// Message for the receiver: `Σ_x aggregate(x) · P[x][y]`, normalized over `y`.
///
/// A zero total yields the uniform message.
pub fn compute_message(aggregate: &[f64], potential: &Potential) -> Vec<f64> {
    let scale: f64 = aggregate.iter().sum();
    let mut message = if scale > 0.0 && scale.is_finite() {
        let scaled: Vec<f64> = aggregate.iter().map(|w| w / scale).collect();
        potential.propagate(&scaled)
    } else {
        vec![0.0; potential.target_len()]
    };
    if normalize_or_uniform(&mut message) {
        debug!("zero-mass message, sending uniform");
    }
    message
}
