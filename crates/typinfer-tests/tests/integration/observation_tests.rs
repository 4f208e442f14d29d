//! Observation-driven Bayesian updates through the graph API.

use typinfer_core::typology::ReferencePopulation;
use typinfer_core::{InferenceConfig, InferenceError, InferenceGraph};
use typinfer_tests::StaticProvider;

fn word_order_graph(prior: &[f64]) -> InferenceGraph {
    let provider = StaticProvider::new()
        .property("P", &["VSO", "SVO"])
        .prior("P", prior);
    InferenceGraph::build(
        "target",
        &["P"],
        &provider,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap()
}

fn three_valued_graph() -> InferenceGraph {
    let provider = StaticProvider::new()
        .property("Q", &["a", "b", "c"])
        .prior("Q", &[0.5, 0.3, 0.2]);
    InferenceGraph::build(
        "target",
        &["Q"],
        &provider,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap()
}

#[test]
fn observation_shifts_belief_toward_dominant_value() {
    let mut graph = word_order_graph(&[0.7, 0.3]);
    graph
        .add_observation("P", [("VSO", 8), ("SVO", 2)])
        .unwrap();
    let outcome = graph.run_observation_update();
    assert_eq!(outcome.applied, 1);

    let belief = graph.belief("P").unwrap();
    assert!(belief.get("VSO").unwrap() > 0.7);
    assert!(belief.is_normalized(1e-9));
    // 0.9^8 · 0.1^2 against 0.9^2 · 0.1^8 crosses the autolock threshold.
    assert!(graph.node("P").unwrap().is_locked());
    assert_eq!(graph.belief_history("P").unwrap().len(), 2);
}

#[test]
fn balanced_counts_leave_prior_unchanged() {
    let mut graph = word_order_graph(&[0.7, 0.3]);
    graph.add_observation("P", [("VSO", 3), ("SVO", 3)]).unwrap();
    graph.run_observation_update();
    let belief = graph.belief("P").unwrap();
    assert!((belief.get("VSO").unwrap() - 0.7).abs() < 1e-12);
    assert!(!graph.node("P").unwrap().is_locked());
}

#[test]
fn update_is_narrowed_to_observed_support() {
    let mut graph = three_valued_graph();
    graph.add_observation("Q", [("a", 3), ("b", 1)]).unwrap();
    graph.run_observation_update();

    let belief = graph.belief("Q").unwrap();
    assert!((belief.get("c").unwrap() - 0.2).abs() < 1e-15);
    assert!(belief.get("a").unwrap() > 0.5);
    assert!(belief.get("b").unwrap() < 0.3);
    assert!(belief.is_normalized(1e-9));
}

#[test]
fn unknown_value_fails_loudly() {
    let mut graph = three_valued_graph();
    let err = graph
        .add_observation("Q", [("a", 1), ("zzz", 1)])
        .unwrap_err();
    assert!(matches!(err, InferenceError::UnknownValue { .. }));
    assert_eq!(graph.node("Q").unwrap().pending_observations(), 0);

    assert!(matches!(
        graph.add_observation("nope", [("a", 1)]),
        Err(InferenceError::UnknownProperty(_))
    ));
    assert!(matches!(
        graph.inject_peak_belief("Q", "zzz", 0.9, false),
        Err(InferenceError::UnknownValue { .. })
    ));
}

#[test]
fn single_value_observation_is_skipped_without_affecting_others() {
    let mut graph = three_valued_graph();
    graph.add_observation("Q", [("a", 5)]).unwrap();
    graph.add_observation("Q", [("a", 1), ("b", 1)]).unwrap();
    let outcome = graph.run_observation_update();
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.applied, 1);
    assert!((graph.belief("Q").unwrap().get("a").unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn second_drain_with_empty_inbox_is_a_no_op() {
    let mut graph = three_valued_graph();
    graph.add_observation("Q", [("a", 2), ("c", 1)]).unwrap();
    graph.run_observation_update();
    let after_first = graph.belief("Q").unwrap().clone();
    let history = graph.belief_history("Q").unwrap().len();

    let outcome = graph.run_observation_update();
    assert_eq!(outcome.applied + outcome.skipped, 0);
    assert_eq!(graph.belief("Q").unwrap(), &after_first);
    assert_eq!(graph.belief_history("Q").unwrap().len(), history);
}

#[test]
fn autolock_stops_remaining_observations() {
    let mut graph = word_order_graph(&[0.7, 0.3]);
    graph.add_observation("P", [("VSO", 8), ("SVO", 2)]).unwrap();
    graph.add_observation("P", [("VSO", 0), ("SVO", 20)]).unwrap();
    let outcome = graph.run_observation_update();
    assert!(outcome.locked);
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.skipped, 1);
    assert!(graph.belief("P").unwrap().get("VSO").unwrap() > 0.99);
}

#[test]
fn peak_belief_spreads_remainder_and_may_autolock() {
    let mut graph = three_valued_graph();
    graph.inject_peak_belief("Q", "b", 0.8, false).unwrap();
    let belief = graph.belief("Q").unwrap();
    assert_eq!(belief.get("b"), Some(0.8));
    assert!((belief.get("a").unwrap() - 0.1).abs() < 1e-12);
    assert!(!graph.node("Q").unwrap().is_locked());

    graph.inject_peak_belief("Q", "c", 0.995, false).unwrap();
    assert!(graph.node("Q").unwrap().is_locked());
    assert_eq!(graph.locked_properties().into_iter().collect::<Vec<_>>(), vec!["Q"]);

    // Further injections on a locked node are ignored.
    graph.inject_peak_belief("Q", "a", 0.9, true).unwrap();
    assert_eq!(graph.belief("Q").unwrap().get("c"), Some(0.995));
    assert!(matches!(
        graph.inject_peak_belief("Q", "a", 1.5, false),
        Err(InferenceError::InvalidProbability(_))
    ));
}

#[test]
fn overflowing_counts_are_rejected_before_queueing() {
    let mut graph = word_order_graph(&[0.7, 0.3]);
    let err = graph
        .add_observation("P", [("VSO", u64::MAX), ("SVO", 1)])
        .unwrap_err();
    assert!(matches!(err, InferenceError::Validation(_)));
    assert_eq!(graph.node("P").unwrap().pending_observations(), 0);

    let outcome = graph.run_observation_update();
    assert_eq!(outcome.applied + outcome.skipped, 0);
    assert!((graph.belief("P").unwrap().get("VSO").unwrap() - 0.7).abs() < 1e-12);
}
