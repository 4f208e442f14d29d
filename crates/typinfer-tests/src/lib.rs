//! Shared fixtures for the typinfer integration tests under `tests/`.

use std::collections::BTreeMap;

use typinfer_core::typology::{
    Language, Origin, Property, ReferencePopulation, TypologyDataset, TypologyProvider, ValueId,
};
use typinfer_core::{Potential, TypologyCorpus};

/// Provider backed by hand-written priors and potentials, ignoring the
/// reference population.
#[derive(Debug, Default)]
pub struct StaticProvider {
    properties: BTreeMap<String, Property>,
    priors: BTreeMap<String, Vec<f64>>,
    potentials: BTreeMap<(String, String), Potential>,
    languages: Vec<Language>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|v| ValueId::from(*v)).collect();
        self.properties
            .insert(name.to_string(), Property::new(name, Origin::Wals, values));
        self
    }

    pub fn prior(mut self, name: &str, weights: &[f64]) -> Self {
        self.priors.insert(name.to_string(), weights.to_vec());
        self
    }

    pub fn potential(mut self, source: &str, target: &str, rows: Vec<Vec<f64>>) -> Self {
        let potential = Potential::from_rows(rows).expect("fixture potential");
        self.potentials
            .insert((source.to_string(), target.to_string()), potential);
        self
    }

    /// Uniform potentials in both directions between `a` and `b`.
    pub fn uniform_link(self, a: &str, b: &str) -> Self {
        let (na, nb) = (self.properties[a].len(), self.properties[b].len());
        self.potential(a, b, vec![vec![1.0; nb]; na])
            .potential(b, a, vec![vec![1.0; na]; nb])
    }
}

impl TypologyProvider for StaticProvider {
    fn resolve_property(&self, name: &str) -> Option<Property> {
        self.properties.get(name).cloned()
    }

    fn prior(&self, property: &Property, _population: &ReferencePopulation) -> Option<Vec<f64>> {
        self.priors.get(property.name()).cloned()
    }

    fn potential(
        &self,
        source: &Property,
        target: &Property,
        _population: &ReferencePopulation,
    ) -> Option<Potential> {
        self.potentials
            .get(&(source.name().to_string(), target.name().to_string()))
            .cloned()
    }

    fn languages(&self) -> &[Language] {
        &self.languages
    }

    fn language_value(&self, _language: &str, _property: &Property) -> Option<ValueId> {
        None
    }
}

/// Twelve languages with WALS word order (81A), adposition order (85A) and
/// a Grambank feature (GB020). Head-initial languages cluster on
/// VO + prepositions; head-final ones on OV + postpositions.
pub fn word_order_corpus() -> TypologyCorpus {
    const ROWS: [(&str, &str, &str, &str, &str); 12] = [
        ("eng", "Indo-European", "SVO", "Prep", "GB020-0"),
        ("fra", "Indo-European", "SVO", "Prep", "GB020-0"),
        ("spa", "Indo-European", "SVO", "Prep", "GB020-0"),
        ("ind", "Austronesian", "SVO", "Prep", "GB020-0"),
        ("tgl", "Austronesian", "VSO", "Prep", "GB020-0"),
        ("cym", "Indo-European", "VSO", "Prep", "GB020-0"),
        ("jpn", "Japonic", "SOV", "Postp", "GB020-1"),
        ("kor", "Koreanic", "SOV", "Postp", "GB020-1"),
        ("tur", "Turkic", "SOV", "Postp", "GB020-1"),
        ("hin", "Indo-European", "SOV", "Postp", "GB020-1"),
        ("que", "Quechuan", "SOV", "Postp", "GB020-1"),
        ("eus", "Isolate", "SOV", "Postp", "GB020-0"),
    ];

    let mut corpus = TypologyCorpus::new();
    let mut wals = TypologyDataset::new(Origin::Wals);
    wals.add_property("81A", ["SOV", "SVO", "VSO"]).expect("81A");
    wals.add_property("85A", ["Postp", "Prep"]).expect("85A");
    let mut grambank = TypologyDataset::new(Origin::Grambank);
    grambank
        .add_property("GB020", ["GB020-0", "GB020-1"])
        .expect("GB020");

    for (id, family, order, adposition, gb) in ROWS {
        let mut language = Language::new(id);
        language.family = Some(family.to_string());
        corpus.add_language(language);
        wals.assign(id, "81A", order).expect("81A value");
        wals.assign(id, "85A", adposition).expect("85A value");
        grambank.assign(id, "GB020", gb).expect("GB020 value");
    }
    corpus.add_dataset(wals).expect("wals");
    corpus.add_dataset(grambank).expect("grambank");
    corpus
}

/// JSON rendition of a small two-namespace corpus with a precomputed
/// cross-namespace table.
pub const SAMPLE_DATASET: &str = r#"{
    "languages": [
        { "id": "eng", "family": "Indo-European", "macroarea": "Eurasia" },
        { "id": "deu", "family": "Indo-European", "macroarea": "Eurasia" },
        { "id": "jpn", "family": "Japonic", "macroarea": "Eurasia" },
        { "id": "tgl", "family": "Austronesian", "macroarea": "Papunesia" },
        { "id": "mri", "family": "Austronesian", "macroarea": "Papunesia" },
        { "id": "tur", "family": "Turkic", "macroarea": "Eurasia" }
    ],
    "wals": {
        "parameters": [
            { "name": "81A", "values": ["SOV", "SVO", "VSO"] },
            { "name": "85A", "values": ["Postp", "Prep"] }
        ],
        "values": {
            "eng": { "81A": "SVO", "85A": "Prep" },
            "deu": { "81A": "SVO", "85A": "Prep" },
            "jpn": { "81A": "SOV", "85A": "Postp" },
            "tgl": { "81A": "VSO", "85A": "Prep" },
            "mri": { "81A": "VSO", "85A": "Prep" },
            "tur": { "81A": "SOV", "85A": "Postp" }
        }
    },
    "grambank": {
        "parameters": [{ "name": "GB020", "values": ["GB020-0", "GB020-1"] }],
        "values": {
            "eng": { "GB020": "GB020-0" },
            "jpn": { "GB020": "GB020-1" },
            "tur": { "GB020": "GB020-1" }
        }
    },
    "potential_tables": [
        { "source": "wals", "target": "grambank", "entries": [
            { "source": "SOV", "target": "GB020-1", "probability": 0.85 },
            { "source": "SOV", "target": "GB020-0", "probability": 0.15 },
            { "source": "SVO", "target": "GB020-0", "probability": 0.7 },
            { "source": "SVO", "target": "GB020-1", "probability": 0.3 }
        ] }
    ]
}"#;
