//! Loading JSON datasets and precomputed cross-namespace tables.

use typinfer_core::typology::{LanguageFilter, Origin, ReferencePopulation};
use typinfer_core::{InferenceConfig, InferenceGraph, TypologyCorpus, TypologyProvider};
use typinfer_tests::SAMPLE_DATASET;

#[test]
fn sample_dataset_loads_both_namespaces() {
    let corpus = TypologyCorpus::from_json_str(SAMPLE_DATASET).unwrap();
    assert_eq!(corpus.languages().len(), 6);

    let order = corpus.resolve_property("81A").unwrap();
    let gb = corpus.resolve_property("GB020").unwrap();
    assert_eq!(order.origin(), Origin::Wals);
    assert_eq!(gb.origin(), Origin::Grambank);
    assert_eq!(corpus.language_value("mri", &order).unwrap().as_str(), "VSO");
    assert!(corpus.language_value("mri", &gb).is_none());
}

#[test]
fn precomputed_table_overrides_cooccurrence() {
    let corpus = TypologyCorpus::from_json_str(SAMPLE_DATASET).unwrap();
    let graph = InferenceGraph::build(
        "target",
        &["81A", "85A", "GB020"],
        &corpus,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap();

    let table = graph.edge("81A", "GB020").unwrap();
    assert!((table.get(0, 1) - 0.85).abs() < 1e-12);
    assert!((table.get(1, 0) - 0.7).abs() < 1e-12);
    // No VSO entries: the all-zero row becomes uniform.
    assert_eq!(table.row(2), &[0.5, 0.5]);

    // The wals → grambank table has no 85A cells, so no edge.
    assert!(graph.edge("85A", "GB020").is_none());

    // No grambank → wals table: co-occurrence over eng, jpn, tur.
    let reverse = graph.edge("GB020", "81A").unwrap();
    assert_eq!(reverse.row(0), &[0.0, 1.0, 0.0]);
    assert_eq!(reverse.row(1), &[1.0, 0.0, 0.0]);
    assert_eq!(graph.build_report().missing_potentials, 1);
}

#[test]
fn macroarea_filter_applies_to_loaded_metadata() {
    let corpus = TypologyCorpus::from_json_str(SAMPLE_DATASET).unwrap();
    let population = ReferencePopulation::Filtered(LanguageFilter {
        macroarea: Some("Papunesia".into()),
        ..LanguageFilter::default()
    });
    let order = corpus.resolve_property("81A").unwrap();
    assert_eq!(corpus.prior(&order, &population).unwrap(), vec![0.0, 0.0, 1.0]);

    let gb = corpus.resolve_property("GB020").unwrap();
    assert!(corpus.prior(&gb, &population).is_none());
}

#[test]
fn unattested_property_starts_uniform() {
    let corpus = TypologyCorpus::from_json_str(SAMPLE_DATASET).unwrap();
    let graph = InferenceGraph::build(
        "target",
        &["GB020"],
        &corpus,
        &ReferencePopulation::Filtered(LanguageFilter {
            family: Some("Austronesian".into()),
            ..LanguageFilter::default()
        }),
        InferenceConfig::default(),
    )
    .unwrap();
    assert_eq!(graph.build_report().uniform_priors, vec!["GB020"]);
    assert_eq!(graph.belief("GB020").unwrap().probabilities(), &[0.5, 0.5]);
}

#[test]
fn out_of_range_table_probability_is_rejected() {
    let bad = r#"{
        "wals": { "parameters": [{ "name": "81A", "values": ["SOV"] }] },
        "grambank": { "parameters": [{ "name": "GB020", "values": ["GB020-0"] }] },
        "potential_tables": [{ "source": "wals", "target": "grambank",
            "entries": [{ "source": "SOV", "target": "GB020-0", "probability": 1.5 }] }]
    }"#;
    assert!(TypologyCorpus::from_json_str(bad).is_err());
}
