//! Typological data model and the providers that feed the engine.
//!
//! - **catalogue**: namespaces, value ids, properties, reference populations
//! - **provider**: the [`TypologyProvider`] capability trait
//! - **corpus**: in-memory corpus computing priors and potentials
//! - **dataset**: JSON loading (feature `serde`)

pub mod catalogue;
pub mod corpus;
#[cfg(feature = "serde")]
pub mod dataset;
pub mod provider;

pub use catalogue::{Language, LanguageFilter, Origin, Property, ReferencePopulation, ValueId};
pub use corpus::{PotentialTable, TypologyCorpus, TypologyDataset};
pub use provider::TypologyProvider;
