//! Error types for typinfer inference.

use thiserror::Error;

/// Errors that can occur while building or driving an inference graph.
///
/// Most degenerate situations (missing potentials, zero-mass normalization,
/// mutations of locked nodes, malformed observations) are recovered locally
/// and reported through `tracing` diagnostics instead. The variants below are
/// reserved for caller bugs and invalid inputs.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// without breaking changes.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    /// A property name that is not part of the inference graph or catalogue.
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// A value id that is not admissible for the given property.
    #[error("unknown value '{value}' for property '{property}'")]
    UnknownValue { property: String, value: String },

    /// A probability outside [0, 1] or otherwise unusable.
    #[error("invalid probability: {0}")]
    InvalidProbability(String),

    /// Configuration validation error (e.g., autolock threshold out of range).
    #[error("validation error: {0}")]
    Validation(String),

    /// Numerical stability error (NaN/Inf in a belief or potential).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Malformed typology dataset or potential table.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl InferenceError {
    pub(crate) fn unknown_value(property: &str, value: &str) -> Self {
        InferenceError::UnknownValue {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}
