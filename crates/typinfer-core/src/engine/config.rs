//! Inference configuration.

use crate::engine::errors::InferenceError;

/// Tunables for one inference session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InferenceConfig {
    /// Probability mass assigned to the generating value for one observed
    /// instance (`p_yes`). Must be in (0, 1).
    pub observation_influence: f64,
    /// A node locks once any belief component exceeds this. Must be in (0, 1].
    pub autolock_threshold: f64,
    /// Seed for the randomized propagation path.
    pub seed: u64,
    /// Append every belief change to the node's history.
    pub record_history: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            observation_influence: 0.9,
            autolock_threshold: 0.99,
            seed: 0,
            record_history: true,
        }
    }
}

impl InferenceConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(self) -> Result<Self, InferenceError> {
        if !(self.observation_influence > 0.0 && self.observation_influence < 1.0) {
            return Err(InferenceError::Validation(
                "observation_influence must be in (0, 1)".into(),
            ));
        }
        if !(self.autolock_threshold > 0.0 && self.autolock_threshold <= 1.0) {
            return Err(InferenceError::Validation(
                "autolock_threshold must be in (0, 1]".into(),
            ));
        }
        Ok(self)
    }
}
