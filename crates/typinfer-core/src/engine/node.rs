//! # Parameter Nodes
//!
//! A [`ParameterNode`] holds the belief state of one property for the target
//! language. Its lifecycle:
//!
//! ```text
//! initialized (from prior) ──update*──▶ ... ──lock / autolock──▶ locked
//! ```
//!
//! Nodes are created already initialized: the graph builder hands each node its
//! prior, so the uninitialized state never escapes construction. Once locked,
//! neither observation updates nor consolidation mutate the belief; attempts are
//! logged and ignored.
//!
//! ## Observation update
//!
//! For an observation `o` over `n ≥ 2` distinct values with total count `N`,
//! every candidate true value `x ∈ o` gets the multinomial likelihood
//!
//! ```text
//! L(x) = N! / Π o[v]!  ·  p_yes^o[x]  ·  p_not^(N − o[x]),   p_not = (1 − p_yes) / (n − 1)
//! ```
//!
//! and the posterior `∝ L(x) · prior(x)` is renormalized over the observed
//! support only. Values outside the observation keep their probability; the
//! observed values share the prior mass they held before the update, so the
//! whole vector still sums to 1.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::engine::belief::{log_sum_exp, normalize_or_uniform, BeliefVector};
use crate::engine::errors::InferenceError;
use crate::typology::{Property, ValueId};

/// Arena index of a node inside its [`InferenceGraph`](crate::engine::graph::InferenceGraph).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Observed value counts for one property, e.g. "8 sentences used A, 2 used B".
///
/// Value ids are resolved against the property on construction; counts for a
/// repeated value id are summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationCount {
    counts: SmallVec<[(usize, u64); 4]>,
    total: u64,
}

impl ObservationCount {
    /// Resolves `(value id, count)` pairs against `property`.
    ///
    /// Fails with [`InferenceError::UnknownValue`] if a value id is not
    /// admissible for the property, and with [`InferenceError::Validation`]
    /// if the total count does not fit in a `u64`.
    pub fn new<'a, I>(property: &Property, counts: I) -> Result<Self, InferenceError>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let overflow = || {
            InferenceError::Validation(format!(
                "observation counts for '{}' overflow u64",
                property.name()
            ))
        };
        let mut resolved: SmallVec<[(usize, u64); 4]> = SmallVec::new();
        let mut total: u64 = 0;
        for (value, count) in counts {
            let index = property
                .index_of(value)
                .ok_or_else(|| InferenceError::unknown_value(property.name(), value))?;
            total = total.checked_add(count).ok_or_else(overflow)?;
            match resolved.iter_mut().find(|(i, _)| *i == index) {
                // Bounded by `total`, so this cannot overflow.
                Some((_, c)) => *c += count,
                None => resolved.push((index, count)),
            }
        }
        resolved.sort_unstable_by_key(|(i, _)| *i);
        Ok(Self {
            counts: resolved,
            total,
        })
    }

    /// Number of distinct values present.
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `(value index, count)` pairs in value order.
    pub fn counts(&self) -> &[(usize, u64)] {
        &self.counts
    }
}

/// What one observation update did to a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservationOutcome {
    pub applied: usize,
    pub skipped: usize,
    /// The node autolocked during this update.
    pub locked: bool,
}

/// Belief state of one property.
#[derive(Debug, Clone)]
pub struct ParameterNode {
    property: Property,
    belief: BeliefVector,
    history: Vec<BeliefVector>,
    locked: bool,
    record_history: bool,
    observation_inbox: SmallVec<[ObservationCount; 2]>,
    message_inbox: BTreeMap<NodeIndex, Vec<f64>>,
}

impl ParameterNode {
    /// Creates a node initialized from `prior`.
    pub fn new(property: Property, prior: BeliefVector, record_history: bool) -> Self {
        let mut node = Self {
            property,
            belief: prior,
            history: Vec::new(),
            locked: false,
            record_history,
            observation_inbox: SmallVec::new(),
            message_inbox: BTreeMap::new(),
        };
        node.record();
        node
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    pub fn name(&self) -> &str {
        self.property.name()
    }

    pub fn belief(&self) -> &BeliefVector {
        &self.belief
    }

    pub fn history(&self) -> &[BeliefVector] {
        &self.history
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn pending_observations(&self) -> usize {
        self.observation_inbox.len()
    }

    pub fn pending_messages(&self) -> usize {
        self.message_inbox.len()
    }

    /// Arg-max value of the current belief.
    pub fn consensus(&self) -> Option<(&ValueId, f64)> {
        self.belief.argmax()
    }

    fn record(&mut self) {
        if self.record_history {
            self.history.push(self.belief.clone());
        }
    }

    /// Replaces the belief with a (new) prior. Ignored on a locked node.
    pub fn initialize_from_prior(&mut self, prior: BeliefVector) -> Result<(), InferenceError> {
        if prior.values() != self.property.values() {
            return Err(InferenceError::Internal(format!(
                "prior for '{}' does not match its value set",
                self.name()
            )));
        }
        if self.locked {
            debug!(property = %self.name(), "ignoring prior re-initialization of locked node");
            return Ok(());
        }
        self.belief = prior;
        self.record();
        Ok(())
    }

    /// Pins `probability` on `value` and spreads the rest uniformly.
    ///
    /// Locks the node if `lock` is set or the pinned probability exceeds
    /// `autolock_threshold`. Ignored (with a diagnostic) on a locked node.
    pub fn inject_peak_belief(
        &mut self,
        value: &str,
        probability: f64,
        lock: bool,
        autolock_threshold: f64,
    ) -> Result<(), InferenceError> {
        let index = self
            .property
            .index_of(value)
            .ok_or_else(|| InferenceError::unknown_value(self.name(), value))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(format!(
                "peak belief {} for '{}' is outside [0, 1]",
                probability,
                self.name()
            )));
        }
        if self.locked {
            debug!(property = %self.name(), value, "ignoring peak belief on locked node");
            return Ok(());
        }

        self.belief = BeliefVector::peak(self.property.shared_values(), index, probability);
        self.record();
        if lock || self.belief.max_probability() > autolock_threshold {
            self.locked = true;
            debug!(property = %self.name(), value, probability, "node locked");
        }
        Ok(())
    }

    /// Queues an observation for the next observation update.
    pub fn enqueue_observation(&mut self, observation: ObservationCount) {
        self.observation_inbox.push(observation);
    }

    /// Drains the observation inbox, applying each observation as a Bayesian
    /// update over its observed support.
    pub fn run_observation_update(
        &mut self,
        observation_influence: f64,
        autolock_threshold: f64,
    ) -> ObservationOutcome {
        let mut outcome = ObservationOutcome::default();
        let pending = std::mem::take(&mut self.observation_inbox);
        if pending.is_empty() {
            return outcome;
        }
        if self.locked {
            debug!(
                property = %self.name(),
                discarded = pending.len(),
                "ignoring observations on locked node"
            );
            outcome.skipped = pending.len();
            return outcome;
        }

        for (position, observation) in pending.iter().enumerate() {
            if self.locked {
                outcome.skipped += pending.len() - position;
                break;
            }
            match self.apply_observation(observation, observation_influence) {
                Ok(()) => {
                    outcome.applied += 1;
                    self.record();
                    if self.belief.max_probability() > autolock_threshold {
                        self.locked = true;
                        outcome.locked = true;
                        debug!(property = %self.name(), "node autolocked after observation");
                    }
                }
                Err(reason) => {
                    warn!(property = %self.name(), %reason, "skipping observation");
                    outcome.skipped += 1;
                }
            }
        }
        outcome
    }

    fn apply_observation(
        &mut self,
        observation: &ObservationCount,
        p_yes: f64,
    ) -> Result<(), String> {
        let n = observation.distinct_values();
        if n < 2 {
            return Err(format!("needs at least two distinct values, got {}", n));
        }
        let p_not = (1.0 - p_yes) / (n - 1) as f64;
        let total = observation.total();
        let ln_coefficient = ln_multinomial_coefficient(total, observation.counts());
        let (ln_yes, ln_not) = (p_yes.ln(), p_not.ln());

        let prior = self.belief.probabilities();
        let support_mass: f64 = observation.counts().iter().map(|&(i, _)| prior[i]).sum();
        if support_mass <= 0.0 {
            return Err("prior assigns no mass to the observed values".into());
        }

        let log_posterior: SmallVec<[f64; 4]> = observation
            .counts()
            .iter()
            .map(|&(i, count)| {
                let others = (total - count) as f64;
                let ln_likelihood = ln_coefficient + count as f64 * ln_yes + others * ln_not;
                ln_likelihood + prior[i].ln()
            })
            .collect();
        let ln_norm = log_sum_exp(&log_posterior);
        if !ln_norm.is_finite() {
            return Err("posterior has no finite mass".into());
        }

        let belief = self.belief.probabilities_mut();
        for (&(i, _), ln_p) in observation.counts().iter().zip(log_posterior.iter()) {
            belief[i] = support_mass * (ln_p - ln_norm).exp();
        }
        Ok(())
    }

    /// Stores `message` from `sender`, replacing any unconsumed one.
    pub(crate) fn receive_message(&mut self, sender: NodeIndex, message: Vec<f64>) {
        self.message_inbox.insert(sender, message);
    }

    /// Unconsumed message from `sender`, if any.
    pub fn message_from(&self, sender: NodeIndex) -> Option<&[f64]> {
        self.message_inbox.get(&sender).map(Vec::as_slice)
    }

    /// Own belief times every queued message except the one from `exclude`.
    pub(crate) fn aggregated_belief(&self, exclude: NodeIndex) -> Vec<f64> {
        let mut aggregate = self.belief.probabilities().to_vec();
        for (sender, message) in &self.message_inbox {
            if *sender == exclude {
                continue;
            }
            for (slot, m) in aggregate.iter_mut().zip(message) {
                *slot *= m;
            }
        }
        aggregate
    }

    /// Folds every queued message into the belief and clears the inbox.
    ///
    /// Returns the max absolute belief change. Locked nodes only drop their
    /// messages.
    pub fn consolidate(&mut self) -> f64 {
        let messages = std::mem::take(&mut self.message_inbox);
        if self.locked {
            return 0.0;
        }

        let previous = self.belief.clone();
        let belief = self.belief.probabilities_mut();
        for message in messages.values() {
            for (slot, m) in belief.iter_mut().zip(message) {
                *slot *= m;
            }
        }
        if normalize_or_uniform(belief) {
            debug!(property = %self.name(), "zero-mass consolidation, using uniform belief");
        }
        let delta = self.belief.max_abs_delta(&previous);
        self.record();
        delta
    }
}

/// `ln(N! / Π c_k!)` for integer counts.
fn ln_multinomial_coefficient(total: u64, counts: &[(usize, u64)]) -> f64 {
    ln_factorial(total) - counts.iter().map(|&(_, c)| ln_factorial(c)).sum::<f64>()
}

/// Exact sum below a cutoff, Stirling series above it.
fn ln_factorial(n: u64) -> f64 {
    const EXACT_CUTOFF: u64 = 256;
    if n < 2 {
        return 0.0;
    }
    if n <= EXACT_CUTOFF {
        return (2..=n).map(|k| (k as f64).ln()).sum();
    }
    let x = n as f64;
    x * x.ln() - x + 0.5 * (2.0 * std::f64::consts::PI * x).ln() + 1.0 / (12.0 * x)
        - 1.0 / (360.0 * x.powi(3))
}
