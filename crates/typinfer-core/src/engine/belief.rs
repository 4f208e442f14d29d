//! Belief vectors: categorical distributions over one property's values.
//!
//! A [`BeliefVector`] is aligned with the canonical value order of its
//! [`Property`](crate::typology::Property). Every externally observable belief
//! is non-negative and sums to 1 within [`SUM_TOLERANCE`]; degenerate (zero
//! mass) vectors are replaced by the uniform distribution rather than surfaced
//! as errors.

use std::sync::Arc;

use crate::engine::errors::InferenceError;
use crate::typology::ValueId;

/// Tolerance for the sum-to-one invariant.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Probabilities below this are treated as zero when computing entropy.
const ENTROPY_FLOOR: f64 = 1e-12;

/// A probability distribution over the admissible values of one property.
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefVector {
    values: Arc<[ValueId]>,
    probabilities: Vec<f64>,
}

impl BeliefVector {
    /// Uniform distribution over `values`.
    pub fn uniform(values: Arc<[ValueId]>) -> Self {
        let n = values.len();
        let p = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        Self {
            probabilities: vec![p; n],
            values,
        }
    }

    /// Builds a belief from raw non-negative weights, normalizing them.
    ///
    /// All-zero weights fall back to the uniform distribution.
    pub fn from_weights(values: Arc<[ValueId]>, weights: Vec<f64>) -> Result<Self, InferenceError> {
        if weights.len() != values.len() {
            return Err(InferenceError::Internal(format!(
                "belief has {} weights for {} values",
                weights.len(),
                values.len()
            )));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(InferenceError::Numerical(format!(
                "belief weight {} is negative or non-finite",
                bad
            )));
        }
        let mut probabilities = weights;
        normalize_or_uniform(&mut probabilities);
        Ok(Self {
            values,
            probabilities,
        })
    }

    /// A peaked belief: `probability` on `index`, the remainder spread
    /// uniformly over the other values.
    ///
    /// A single-valued property always gets probability 1.
    pub(crate) fn peak(values: Arc<[ValueId]>, index: usize, probability: f64) -> Self {
        let n = values.len();
        let probabilities = if n <= 1 {
            vec![1.0; n]
        } else {
            let rest = (1.0 - probability) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == index { probability } else { rest })
                .collect()
        };
        Self {
            values,
            probabilities,
        }
    }

    pub fn values(&self) -> &[ValueId] {
        &self.values
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub(crate) fn probabilities_mut(&mut self) -> &mut [f64] {
        &mut self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Probability of a value id, `None` if it is not admissible.
    pub fn get(&self, value: &str) -> Option<f64> {
        self.values
            .iter()
            .position(|v| v.as_str() == value)
            .map(|i| self.probabilities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValueId, f64)> + '_ {
        self.values.iter().zip(self.probabilities.iter().copied())
    }

    /// Arg-max value and its probability. Ties go to the earliest value.
    pub fn argmax(&self) -> Option<(&ValueId, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in self.probabilities.iter().enumerate() {
            match best {
                Some((_, b)) if p <= b => {}
                _ => best = Some((i, p)),
            }
        }
        best.map(|(i, p)| (&self.values[i], p))
    }

    /// Largest single probability.
    pub fn max_probability(&self) -> f64 {
        self.probabilities.iter().copied().fold(0.0, f64::max)
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f64 {
        self.probabilities
            .iter()
            .filter(|&&p| p > ENTROPY_FLOOR)
            .map(|&p| -p * p.ln())
            .sum()
    }

    /// Max absolute per-value difference to another belief over the same values.
    pub fn max_abs_delta(&self, other: &BeliefVector) -> f64 {
        self.probabilities
            .iter()
            .zip(other.probabilities.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Whether entries are non-negative and sum to 1 within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        let sum: f64 = self.probabilities.iter().sum();
        self.probabilities.iter().all(|&p| p >= 0.0) && (sum - 1.0).abs() <= tolerance
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BeliefVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (value, p) in self.iter() {
            map.serialize_entry(value.as_str(), &p)?;
        }
        map.end()
    }
}

/// Normalizes `weights` in place to sum to 1.
///
/// Returns `true` when the total was zero (or non-finite) and the uniform
/// distribution was substituted.
pub(crate) fn normalize_or_uniform(weights: &mut [f64]) -> bool {
    if weights.is_empty() {
        return false;
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        for w in weights.iter_mut() {
            *w /= total;
        }
        false
    } else {
        let p = 1.0 / weights.len() as f64;
        weights.iter_mut().for_each(|w| *w = p);
        true
    }
}

/// Numerically stable `ln(Σ exp(x_i))`. Returns `-inf` for an empty or
/// all-`-inf` input.
pub(crate) fn log_sum_exp(xs: &[f64]) -> f64 {
    let m = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !m.is_finite() {
        return m;
    }
    m + xs.iter().map(|&x| (x - m).exp()).sum::<f64>().ln()
}
