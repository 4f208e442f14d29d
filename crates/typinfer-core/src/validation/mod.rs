//! Validation of the inference engine against held-out languages.
//!
//! - **leave_one_out**: the per-language hold-out protocol and its report
//! - **bootstrap**: percentile-bootstrap confidence intervals

pub mod bootstrap;
pub mod leave_one_out;

pub use bootstrap::ConfidenceInterval;
pub use leave_one_out::{
    EpochSummary, LanguageEvaluation, LeaveOneOut, PropertyAccuracy, PropertyPrediction,
    ValidationConfig, ValidationReport,
};
