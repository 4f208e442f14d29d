//! In-memory typological corpus acting as prior and potential provider.
//!
//! A [`TypologyCorpus`] holds the languages of the reference corpus with their
//! genealogical metadata and one [`TypologyDataset`] per namespace
//! ([`Origin`]). Priors are empirical value frequencies over a
//! [`ReferencePopulation`]; potentials are row-normalized co-occurrence counts
//! over the same population. A precomputed [`PotentialTable`] registered for an
//! `(Origin, Origin)` pair takes precedence over co-occurrence statistics.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::engine::errors::InferenceError;
use crate::engine::potential::Potential;
use crate::typology::catalogue::{Language, Origin, Property, ReferencePopulation, ValueId};
use crate::typology::provider::TypologyProvider;

/// Properties of one namespace and the values each language exhibits.
#[derive(Debug, Clone)]
pub struct TypologyDataset {
    origin: Origin,
    properties: Vec<Property>,
    by_name: FxHashMap<String, usize>,
    /// language id → property slot → value index
    assignments: FxHashMap<String, FxHashMap<usize, usize>>,
}

impl TypologyDataset {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            properties: Vec::new(),
            by_name: FxHashMap::default(),
            assignments: FxHashMap::default(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.by_name.get(name).map(|&slot| &self.properties[slot])
    }

    /// Registers a property with its admissible values.
    pub fn add_property<I, V>(&mut self, name: &str, values: I) -> Result<(), InferenceError>
    where
        I: IntoIterator<Item = V>,
        V: Into<ValueId>,
    {
        if self.by_name.contains_key(name) {
            return Err(InferenceError::Dataset(format!(
                "property '{}' declared twice in {}",
                name, self.origin
            )));
        }
        let mut ids: Vec<ValueId> = Vec::new();
        for value in values {
            let value = value.into();
            if ids.contains(&value) {
                return Err(InferenceError::Dataset(format!(
                    "property '{}' lists value '{}' twice",
                    name, value
                )));
            }
            ids.push(value);
        }
        if ids.is_empty() {
            return Err(InferenceError::Dataset(format!(
                "property '{}' has no values",
                name
            )));
        }
        self.by_name.insert(name.to_string(), self.properties.len());
        self.properties.push(Property::new(name, self.origin, ids));
        Ok(())
    }

    /// Records that `language` exhibits `value` for `property`.
    pub fn assign(&mut self, language: &str, property: &str, value: &str) -> Result<(), InferenceError> {
        let slot = *self
            .by_name
            .get(property)
            .ok_or_else(|| InferenceError::UnknownProperty(property.to_string()))?;
        let index = self.properties[slot]
            .index_of(value)
            .ok_or_else(|| InferenceError::unknown_value(property, value))?;
        self.assignments
            .entry(language.to_string())
            .or_default()
            .insert(slot, index);
        Ok(())
    }

    /// Value index `language` exhibits for the named property.
    pub fn value_index(&self, language: &str, property: &str) -> Option<usize> {
        let slot = self.by_name.get(property)?;
        self.assignments.get(language)?.get(slot).copied()
    }

    pub(crate) fn attested_languages(&self) -> impl Iterator<Item = &str> {
        self.assignments.keys().map(String::as_str)
    }
}

/// Precomputed conditional table `(source value, target value) → probability`.
#[derive(Debug, Clone, Default)]
pub struct PotentialTable {
    entries: FxHashMap<(ValueId, ValueId), f64>,
}

impl PotentialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        source: impl Into<ValueId>,
        target: impl Into<ValueId>,
        probability: f64,
    ) -> Result<(), InferenceError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(format!(
                "potential table entry {} is outside [0, 1]",
                probability
            )));
        }
        self.entries.insert((source.into(), target.into()), probability);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the potential for an ordered property pair.
    ///
    /// Missing cells count as zero; `None` if the table has no cell at all for
    /// this pair.
    pub fn potential(&self, source: &Property, target: &Property) -> Option<Potential> {
        let mut any = false;
        let rows: Vec<Vec<f64>> = source
            .values()
            .iter()
            .map(|a| {
                target
                    .values()
                    .iter()
                    .map(|b| match self.entries.get(&(a.clone(), b.clone())) {
                        Some(&p) => {
                            any = true;
                            p
                        }
                        None => 0.0,
                    })
                    .collect()
            })
            .collect();
        if !any {
            return None;
        }
        potential_or_warn(source, target, rows)
    }
}

/// Languages plus one dataset per namespace.
#[derive(Debug, Clone, Default)]
pub struct TypologyCorpus {
    languages: Vec<Language>,
    language_slots: FxHashMap<String, usize>,
    datasets: FxHashMap<Origin, TypologyDataset>,
    tables: FxHashMap<(Origin, Origin), PotentialTable>,
}

impl TypologyCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces the metadata of) a language.
    pub fn add_language(&mut self, language: Language) {
        match self.language_slots.get(&language.id) {
            Some(&slot) => self.languages[slot] = language,
            None => {
                self.language_slots
                    .insert(language.id.clone(), self.languages.len());
                self.languages.push(language);
            }
        }
    }

    pub fn language(&self, id: &str) -> Option<&Language> {
        self.language_slots.get(id).map(|&slot| &self.languages[slot])
    }

    /// Installs the dataset for its namespace.
    ///
    /// Fails if a property name is already owned by the other namespace.
    /// Languages attested in the dataset but unknown to the corpus are added
    /// without metadata.
    pub fn add_dataset(&mut self, dataset: TypologyDataset) -> Result<(), InferenceError> {
        for (origin, other) in &self.datasets {
            if *origin == dataset.origin() {
                continue;
            }
            if let Some(clash) = dataset
                .properties()
                .iter()
                .find(|p| other.property(p.name()).is_some())
            {
                return Err(InferenceError::Dataset(format!(
                    "property '{}' exists in both {} and {}",
                    clash.name(),
                    origin,
                    dataset.origin()
                )));
            }
        }

        let mut unseen: Vec<String> = dataset
            .attested_languages()
            .filter(|id| !self.language_slots.contains_key(*id))
            .map(str::to_string)
            .collect();
        unseen.sort();
        for id in unseen {
            debug!(language = %id, origin = %dataset.origin(), "adding language without metadata");
            self.add_language(Language::new(id));
        }

        self.datasets.insert(dataset.origin(), dataset);
        Ok(())
    }

    pub fn dataset(&self, origin: Origin) -> Option<&TypologyDataset> {
        self.datasets.get(&origin)
    }

    /// Registers a precomputed table used for every `source_origin → target_origin` pair.
    pub fn set_potential_table(&mut self, source: Origin, target: Origin, table: PotentialTable) {
        self.tables.insert((source, target), table);
    }

    fn value_index(&self, language: &str, property: &Property) -> Option<usize> {
        self.datasets
            .get(&property.origin())?
            .value_index(language, property.name())
    }

    fn population<'a>(
        &'a self,
        population: &'a ReferencePopulation,
    ) -> impl Iterator<Item = &'a Language> + 'a {
        self.languages.iter().filter(move |l| population.includes(l))
    }

    /// Row-normalized co-occurrence counts over `population`.
    pub fn cooccurrence_potential(
        &self,
        source: &Property,
        target: &Property,
        population: &ReferencePopulation,
    ) -> Option<Potential> {
        let mut counts = vec![vec![0.0; target.len()]; source.len()];
        let mut joint = 0usize;
        for language in self.population(population) {
            let (Some(a), Some(b)) = (
                self.value_index(&language.id, source),
                self.value_index(&language.id, target),
            ) else {
                continue;
            };
            counts[a][b] += 1.0;
            joint += 1;
        }
        if joint == 0 {
            return None;
        }
        potential_or_warn(source, target, counts)
    }
}

fn potential_or_warn(source: &Property, target: &Property, rows: Vec<Vec<f64>>) -> Option<Potential> {
    match Potential::from_rows(rows) {
        Ok(potential) => Some(potential),
        Err(err) => {
            warn!(source = %source.name(), target = %target.name(), %err, "discarding potential");
            None
        }
    }
}

impl TypologyProvider for TypologyCorpus {
    fn resolve_property(&self, name: &str) -> Option<Property> {
        Origin::ALL
            .iter()
            .filter_map(|origin| self.datasets.get(origin))
            .find_map(|dataset| dataset.property(name).cloned())
    }

    fn prior(&self, property: &Property, population: &ReferencePopulation) -> Option<Vec<f64>> {
        let mut counts = vec![0.0; property.len()];
        let mut total = 0usize;
        for language in self.population(population) {
            if let Some(index) = self.value_index(&language.id, property) {
                counts[index] += 1.0;
                total += 1;
            }
        }
        if total == 0 {
            return None;
        }
        for c in counts.iter_mut() {
            *c /= total as f64;
        }
        Some(counts)
    }

    fn potential(
        &self,
        source: &Property,
        target: &Property,
        population: &ReferencePopulation,
    ) -> Option<Potential> {
        match self.tables.get(&(source.origin(), target.origin())) {
            Some(table) => table.potential(source, target),
            None => self.cooccurrence_potential(source, target, population),
        }
    }

    fn potential_ignores_population(&self, source: &Property, target: &Property) -> bool {
        self.tables.contains_key(&(source.origin(), target.origin()))
    }

    fn languages(&self) -> &[Language] {
        &self.languages
    }

    fn language_value(&self, language: &str, property: &Property) -> Option<ValueId> {
        self.value_index(language, property)
            .map(|index| property.values()[index].clone())
    }
}
