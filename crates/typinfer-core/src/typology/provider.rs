//! Provider capabilities consumed by the inference engine.
//!
//! The engine never touches raw typological data. It asks a
//! [`TypologyProvider`] to resolve property names, produce priors for a
//! reference population, and produce pairwise potentials. Implementations are
//! pure lookups over precomputed or in-memory tables and must be shareable
//! across threads, so independent graphs can be evaluated in parallel.

use crate::engine::potential::Potential;
use crate::typology::catalogue::{Language, Property, ReferencePopulation, ValueId};

pub trait TypologyProvider: Send + Sync {
    /// Resolves a property name in whichever namespace owns it.
    fn resolve_property(&self, name: &str) -> Option<Property>;

    /// Empirical value distribution of `property` over `population`, aligned
    /// with `property.values()`. `None` when nothing is known.
    fn prior(&self, property: &Property, population: &ReferencePopulation) -> Option<Vec<f64>>;

    /// Row-stochastic `P(target | source)` estimated over `population`.
    /// `None` when no potential can be derived for the ordered pair.
    fn potential(
        &self,
        source: &Property,
        target: &Property,
        population: &ReferencePopulation,
    ) -> Option<Potential>;

    /// Whether the potential for `source → target` comes from a fixed table
    /// that ignores the reference population.
    fn potential_ignores_population(&self, _source: &Property, _target: &Property) -> bool {
        false
    }

    /// Known languages of the reference corpus.
    fn languages(&self) -> &[Language];

    /// The value `language` exhibits for `property`, if attested.
    fn language_value(&self, language: &str, property: &Property) -> Option<ValueId>;
}
