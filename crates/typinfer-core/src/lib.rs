//! # Typinfer Core
//!
//! Infers unknown grammatical properties of a target language from a few
//! directly observed properties and statistical regularities mined from
//! typological databases. Each property is a categorical belief refined by
//! Bayesian observation updates and loopy belief propagation along
//! corpus-derived pairwise potentials.

#![forbid(unsafe_code)]

pub mod engine;
pub mod typology;
pub mod validation;

// Re-export commonly used types
pub use engine::belief::BeliefVector;
pub use engine::config::InferenceConfig;
pub use engine::errors::InferenceError;
pub use engine::graph::{BuildReport, Consensus, ConvergenceReport, CycleDiagnostics, InferenceGraph};
pub use engine::potential::Potential;
pub use typology::{ReferencePopulation, TypologyCorpus, TypologyProvider};
pub use validation::{LeaveOneOut, ValidationConfig, ValidationReport};
