//! Graph construction over a two-namespace corpus.

use typinfer_core::typology::{LanguageFilter, ReferencePopulation};
use typinfer_core::{InferenceConfig, InferenceError, InferenceGraph};
use typinfer_tests::word_order_corpus;

fn build(properties: &[&str], population: ReferencePopulation) -> InferenceGraph {
    InferenceGraph::build(
        "target",
        properties,
        &word_order_corpus(),
        &population,
        InferenceConfig::default(),
    )
    .unwrap()
}

#[test]
fn unknown_properties_are_dropped_not_fatal() {
    let graph = build(&["81A", "999Z", "GB020"], ReferencePopulation::All);
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.build_report().resolved, vec!["81A", "GB020"]);
    assert_eq!(graph.build_report().unresolved, vec!["999Z"]);
    assert!(graph.belief("999Z").is_none());
}

#[test]
fn priors_are_empirical_frequencies() {
    let graph = build(&["81A"], ReferencePopulation::All);
    let belief = graph.belief("81A").unwrap();
    assert!((belief.get("SOV").unwrap() - 0.5).abs() < 1e-12);
    assert!((belief.get("SVO").unwrap() - 4.0 / 12.0).abs() < 1e-12);
    assert!((belief.get("VSO").unwrap() - 2.0 / 12.0).abs() < 1e-12);
    assert_eq!(graph.belief_history("81A").unwrap().len(), 1);
}

#[test]
fn filtered_population_restricts_priors() {
    let filter = LanguageFilter {
        family: Some("Austronesian".into()),
        ..LanguageFilter::default()
    };
    let graph = build(&["81A"], ReferencePopulation::Filtered(filter));
    let belief = graph.belief("81A").unwrap();
    assert!((belief.get("SVO").unwrap() - 0.5).abs() < 1e-12);
    assert!((belief.get("VSO").unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(belief.get("SOV"), Some(0.0));
}

#[test]
fn excluded_language_does_not_contaminate_prior() {
    let all = build(&["81A"], ReferencePopulation::All);
    let held_out = build(&["81A"], ReferencePopulation::excluding("tgl"));
    let vso_all = all.belief("81A").unwrap().get("VSO").unwrap();
    let vso_held_out = held_out.belief("81A").unwrap().get("VSO").unwrap();
    assert!((vso_all - 2.0 / 12.0).abs() < 1e-12);
    assert!((vso_held_out - 1.0 / 11.0).abs() < 1e-12);
}

#[test]
fn cross_namespace_pairs_are_connected() {
    let graph = build(&["81A", "85A", "GB020"], ReferencePopulation::All);
    assert_eq!(graph.edge_count(), 6);
    let potential = graph.edge("85A", "81A").unwrap();
    // Every postpositional language is SOV.
    assert_eq!(potential.row(0), &[1.0, 0.0, 0.0]);
    assert!(potential.is_row_stochastic(1e-9));
    assert!(graph.edge("GB020", "81A").is_some());
    let mut neighbors = graph.neighbors("GB020");
    neighbors.sort_unstable();
    assert_eq!(neighbors, vec!["81A", "85A"]);
}

#[test]
fn invalid_config_is_rejected() {
    let config = InferenceConfig {
        observation_influence: 1.0,
        ..InferenceConfig::default()
    };
    let result = InferenceGraph::build(
        "target",
        &["81A"],
        &word_order_corpus(),
        &ReferencePopulation::All,
        config,
    );
    assert!(matches!(result, Err(InferenceError::Validation(_))));
}

#[test]
fn reinitializing_from_prior_respects_locks() {
    let corpus = word_order_corpus();
    let mut graph = InferenceGraph::build(
        "target",
        &["81A", "85A"],
        &corpus,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap();
    graph.inject_peak_belief("85A", "Prep", 0.95, true).unwrap();

    let filter = LanguageFilter {
        family: Some("Indo-European".into()),
        ..LanguageFilter::default()
    };
    let population = ReferencePopulation::Filtered(filter);
    graph.initialize_from_prior("81A", &corpus, &population).unwrap();
    graph.initialize_from_prior("85A", &corpus, &population).unwrap();

    // Indo-European: eng, fra, spa SVO; cym VSO; hin SOV.
    let order = graph.belief("81A").unwrap();
    assert!((order.get("SVO").unwrap() - 0.6).abs() < 1e-12);
    assert_eq!(graph.belief("85A").unwrap().get("Prep"), Some(0.95));
    assert_eq!(graph.belief_history("81A").unwrap().len(), 2);
    assert!(matches!(
        graph.initialize_from_prior("nope", &corpus, &population),
        Err(InferenceError::UnknownProperty(_))
    ));
}
