//! # Inference Graph
//!
//! An [`InferenceGraph`] is the belief state of one target language: a set of
//! [`ParameterNode`]s plus directed, weighted edges carrying [`Potential`]s.
//!
//! ## Design
//!
//! - Nodes live in an arena (`Vec<ParameterNode>`) addressed by [`NodeIndex`];
//!   a name index maps property names to slots. Edges are per-node adjacency
//!   maps keyed by receiver, so there are no back-pointers.
//! - An edge `A → B` exists only if the provider could derive a potential for
//!   that ordered pair. The graph need not be complete or symmetric.
//! - The propagation path is drawn from a graph-owned, explicitly seeded
//!   `StdRng`, so two graphs built with the same seed evolve identically.
//! - A graph is single-threaded mutable state. Distinct graphs share nothing
//!   and may be driven from different threads.
//!
//! ## Update cycle
//!
//! One cycle = one message round, then for every node an observation update
//! (if observations are pending) followed by consolidation.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::belief::BeliefVector;
use crate::engine::belief_propagation::{run_message_round, OutgoingEdges};
use crate::engine::config::InferenceConfig;
use crate::engine::errors::InferenceError;
use crate::engine::node::{NodeIndex, ObservationCount, ObservationOutcome, ParameterNode};
use crate::engine::potential::Potential;
use crate::typology::{Property, ReferencePopulation, TypologyProvider, ValueId};

/// What graph construction resolved, dropped, and connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BuildReport {
    /// Property names that resolved, in node order.
    pub resolved: Vec<String>,
    /// Property names no namespace recognized.
    pub unresolved: Vec<String>,
    /// Properties with no attested prior data (initialized uniform).
    pub uniform_priors: Vec<String>,
    /// Number of directed edges created.
    pub edge_count: usize,
    /// Ordered pairs for which no potential could be derived.
    pub missing_potentials: usize,
}

/// Diagnostics for one update cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CycleDiagnostics {
    pub messages_sent: usize,
    pub observations_applied: usize,
    pub observations_skipped: usize,
    /// Nodes that autolocked during this cycle.
    pub newly_locked: usize,
    /// Max absolute belief change over all nodes.
    pub max_belief_delta: f64,
}

/// Outcome of [`InferenceGraph::run_until_stable`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConvergenceReport {
    pub max_cycles: usize,
    pub cycles_run: usize,
    /// Whether the belief delta fell below tolerance before the budget ran out.
    pub converged: bool,
    pub final_max_delta: f64,
}

/// Arg-max read-out for one property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Consensus {
    pub value: ValueId,
    pub probability: f64,
    pub entropy: f64,
    pub locked: bool,
}

/// Belief state of one target language.
#[derive(Debug, Clone)]
pub struct InferenceGraph {
    name: String,
    config: InferenceConfig,
    nodes: Vec<ParameterNode>,
    index: FxHashMap<String, NodeIndex>,
    edges: OutgoingEdges,
    rng: StdRng,
    report: BuildReport,
}

impl InferenceGraph {
    /// Builds a graph over `properties`.
    ///
    /// Unknown property names are dropped with a diagnostic; missing potentials
    /// simply leave the pair unconnected. Every node starts from the provider's
    /// prior over `population` (uniform when nothing is attested).
    pub fn build<S: AsRef<str>>(
        name: impl Into<String>,
        properties: &[S],
        provider: &dyn TypologyProvider,
        population: &ReferencePopulation,
        config: InferenceConfig,
    ) -> Result<Self, InferenceError> {
        let config = config.validate()?;
        let name = name.into();
        let mut report = BuildReport::default();
        let mut nodes: Vec<ParameterNode> = Vec::new();
        let mut index: FxHashMap<String, NodeIndex> = FxHashMap::default();

        for requested in properties {
            let requested = requested.as_ref();
            if index.contains_key(requested) {
                debug!(graph = %name, property = requested, "duplicate property ignored");
                continue;
            }
            let Some(property) = provider.resolve_property(requested) else {
                warn!(graph = %name, property = requested, "unknown property dropped from graph");
                report.unresolved.push(requested.to_string());
                continue;
            };
            let prior = match provider.prior(&property, population) {
                Some(weights) => BeliefVector::from_weights(property.shared_values(), weights)?,
                None => {
                    debug!(graph = %name, property = requested, "no prior data, using uniform");
                    report.uniform_priors.push(requested.to_string());
                    BeliefVector::uniform(property.shared_values())
                }
            };
            index.insert(requested.to_string(), NodeIndex(nodes.len() as u32));
            report.resolved.push(requested.to_string());
            nodes.push(ParameterNode::new(property, prior, config.record_history));
        }

        let edges = build_edges(&nodes, provider, population, &mut report);
        info!(
            graph = %name,
            nodes = nodes.len(),
            edges = report.edge_count,
            unresolved = report.unresolved.len(),
            "inference graph built"
        );

        Ok(Self {
            name,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes,
            index,
            edges,
            report,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn build_report(&self) -> &BuildReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Property names in node order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(ParameterNode::name)
    }

    pub fn nodes(&self) -> &[ParameterNode] {
        &self.nodes
    }

    pub fn node(&self, property: &str) -> Option<&ParameterNode> {
        self.index.get(property).map(|i| &self.nodes[i.slot()])
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.node(name).map(ParameterNode::property)
    }

    fn slot(&self, property: &str) -> Result<NodeIndex, InferenceError> {
        self.index
            .get(property)
            .copied()
            .ok_or_else(|| InferenceError::UnknownProperty(property.to_string()))
    }

    fn node_mut(&mut self, property: &str) -> Result<&mut ParameterNode, InferenceError> {
        let slot = self.slot(property)?;
        Ok(&mut self.nodes[slot.slot()])
    }

    /// Potential on the edge `source → target`, if that edge exists.
    pub fn edge(&self, source: &str, target: &str) -> Option<&Potential> {
        let s = self.index.get(source)?;
        let t = self.index.get(target)?;
        self.edges[s.slot()].get(t)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(BTreeMap::len).sum()
    }

    /// Receivers of `source`'s outgoing edges.
    pub fn neighbors(&self, source: &str) -> Vec<&str> {
        match self.index.get(source) {
            Some(s) => self.edges[s.slot()]
                .keys()
                .map(|t| self.nodes[t.slot()].name())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Message queued at `target` from `source`, not yet consolidated.
    pub fn pending_message(&self, source: &str, target: &str) -> Option<&[f64]> {
        let s = self.index.get(source)?;
        let t = self.index.get(target)?;
        self.nodes[t.slot()].message_from(*s)
    }

    /// Queues an observation for `property`.
    ///
    /// Fails loudly on a property or value id that is not part of the graph.
    pub fn add_observation<'a, I>(&mut self, property: &str, counts: I) -> Result<(), InferenceError>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let node = self.node_mut(property)?;
        let observation = ObservationCount::new(node.property(), counts)?;
        node.enqueue_observation(observation);
        Ok(())
    }

    /// Pins `probability` on `value` for `property` (see
    /// [`ParameterNode::inject_peak_belief`]).
    pub fn inject_peak_belief(
        &mut self,
        property: &str,
        value: &str,
        probability: f64,
        lock: bool,
    ) -> Result<(), InferenceError> {
        let threshold = self.config.autolock_threshold;
        self.node_mut(property)?
            .inject_peak_belief(value, probability, lock, threshold)
    }

    /// Re-initializes `property` from a new prior. Locked nodes are untouched.
    pub fn initialize_from_prior(
        &mut self,
        property: &str,
        provider: &dyn TypologyProvider,
        population: &ReferencePopulation,
    ) -> Result<(), InferenceError> {
        let node = self.node_mut(property)?;
        let values = node.property().shared_values();
        let prior = match provider.prior(node.property(), population) {
            Some(weights) => BeliefVector::from_weights(values, weights)?,
            None => BeliefVector::uniform(values),
        };
        node.initialize_from_prior(prior)
    }

    /// Drains every node's observation inbox.
    pub fn run_observation_update(&mut self) -> ObservationOutcome {
        let (influence, threshold) = (
            self.config.observation_influence,
            self.config.autolock_threshold,
        );
        let mut total = ObservationOutcome::default();
        for node in &mut self.nodes {
            let outcome = node.run_observation_update(influence, threshold);
            total.applied += outcome.applied;
            total.skipped += outcome.skipped;
            total.locked |= outcome.locked;
        }
        total
    }

    /// Runs one message round; returns the number of messages sent.
    pub fn run_message_round(&mut self) -> usize {
        run_message_round(&mut self.nodes, &self.edges, &mut self.rng)
    }

    /// Consolidates every node's queued messages; returns the max belief delta.
    pub fn run_consolidation(&mut self) -> f64 {
        self.nodes
            .iter_mut()
            .map(ParameterNode::consolidate)
            .fold(0.0, f64::max)
    }

    /// One message round, then per node an observation update and consolidation.
    pub fn run_belief_update_cycle(&mut self) -> CycleDiagnostics {
        let mut diagnostics = CycleDiagnostics {
            messages_sent: self.run_message_round(),
            ..CycleDiagnostics::default()
        };

        let (influence, threshold) = (
            self.config.observation_influence,
            self.config.autolock_threshold,
        );
        for node in &mut self.nodes {
            let before = node.belief().clone();
            if node.pending_observations() > 0 {
                let outcome = node.run_observation_update(influence, threshold);
                diagnostics.observations_applied += outcome.applied;
                diagnostics.observations_skipped += outcome.skipped;
                if outcome.locked {
                    diagnostics.newly_locked += 1;
                }
            }
            node.consolidate();
            diagnostics.max_belief_delta = diagnostics
                .max_belief_delta
                .max(node.belief().max_abs_delta(&before));
        }

        debug!(
            graph = %self.name,
            messages = diagnostics.messages_sent,
            delta = diagnostics.max_belief_delta,
            "update cycle complete"
        );
        diagnostics
    }

    /// Runs exactly `cycles` update cycles.
    pub fn run_cycles(&mut self, cycles: usize) -> Vec<CycleDiagnostics> {
        (0..cycles).map(|_| self.run_belief_update_cycle()).collect()
    }

    /// Runs cycles until the max belief delta drops below `tolerance` or
    /// `max_cycles` is spent.
    pub fn run_until_stable(
        &mut self,
        max_cycles: usize,
        tolerance: f64,
    ) -> Result<ConvergenceReport, InferenceError> {
        if max_cycles == 0 {
            return Err(InferenceError::Validation("max_cycles must be > 0".into()));
        }
        if !(tolerance > 0.0 && tolerance.is_finite()) {
            return Err(InferenceError::Validation(
                "tolerance must be finite and > 0".into(),
            ));
        }

        let mut report = ConvergenceReport {
            max_cycles,
            cycles_run: 0,
            converged: false,
            final_max_delta: f64::INFINITY,
        };
        for cycle in 0..max_cycles {
            let diagnostics = self.run_belief_update_cycle();
            report.cycles_run = cycle + 1;
            report.final_max_delta = diagnostics.max_belief_delta;
            if diagnostics.max_belief_delta < tolerance {
                report.converged = true;
                break;
            }
        }
        Ok(report)
    }

    pub fn belief(&self, property: &str) -> Option<&BeliefVector> {
        self.node(property).map(ParameterNode::belief)
    }

    /// Snapshot of every node's belief, keyed by property name.
    pub fn beliefs(&self) -> BTreeMap<String, BeliefVector> {
        self.nodes
            .iter()
            .map(|n| (n.name().to_string(), n.belief().clone()))
            .collect()
    }

    /// Copy of `property`'s belief history, oldest first.
    pub fn belief_history(&self, property: &str) -> Result<Vec<BeliefVector>, InferenceError> {
        let slot = self.slot(property)?;
        Ok(self.nodes[slot.slot()].history().to_vec())
    }

    /// Arg-max value per property.
    pub fn consensus(&self) -> BTreeMap<String, Consensus> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let (value, probability) = node.consensus()?;
                Some((
                    node.name().to_string(),
                    Consensus {
                        value: value.clone(),
                        probability,
                        entropy: node.belief().entropy(),
                        locked: node.is_locked(),
                    },
                ))
            })
            .collect()
    }

    /// Names of locked properties.
    pub fn locked_properties(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_locked())
            .map(ParameterNode::name)
            .collect()
    }
}

fn build_edges(
    nodes: &[ParameterNode],
    provider: &dyn TypologyProvider,
    population: &ReferencePopulation,
    report: &mut BuildReport,
) -> OutgoingEdges {
    let pairs: Vec<(usize, usize)> = (0..nodes.len())
        .flat_map(|i| (0..nodes.len()).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect();

    let derive = |&(i, j): &(usize, usize)| {
        let (source, target) = (nodes[i].property(), nodes[j].property());
        let potential = provider.potential(source, target, population)?;
        if potential.source_len() != source.len() || potential.target_len() != target.len() {
            warn!(
                source = source.name(),
                target = target.name(),
                "potential shape does not match value sets, edge dropped"
            );
            return None;
        }
        Some(potential)
    };

    #[cfg(feature = "parallel")]
    let derived: Vec<Option<Potential>> = pairs.par_iter().map(derive).collect();
    #[cfg(not(feature = "parallel"))]
    let derived: Vec<Option<Potential>> = pairs.iter().map(derive).collect();

    let mut edges: OutgoingEdges = vec![BTreeMap::new(); nodes.len()];
    for (&(i, j), potential) in pairs.iter().zip(derived) {
        match potential {
            Some(potential) => {
                edges[i].insert(NodeIndex(j as u32), potential);
                report.edge_count += 1;
            }
            None => {
                debug!(
                    source = nodes[i].name(),
                    target = nodes[j].name(),
                    "no potential for pair"
                );
                report.missing_potentials += 1;
            }
        }
    }
    edges
}
