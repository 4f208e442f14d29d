//! Message rounds, consolidation and full update cycles.

use typinfer_core::typology::ReferencePopulation;
use typinfer_core::{InferenceConfig, InferenceError, InferenceGraph};
use typinfer_tests::{word_order_corpus, StaticProvider};

fn graph(provider: &StaticProvider, properties: &[&str]) -> InferenceGraph {
    InferenceGraph::build(
        "target",
        properties,
        provider,
        &ReferencePopulation::All,
        InferenceConfig::default().with_seed(7),
    )
    .unwrap()
}

#[test]
fn locked_source_sends_its_potential_row() {
    let provider = StaticProvider::new()
        .property("A", &["a0", "a1"])
        .property("B", &["b0", "b1"])
        .potential("A", "B", vec![vec![0.9, 0.1], vec![0.2, 0.8]]);
    let mut g = graph(&provider, &["A", "B"]);
    assert_eq!(g.edge_count(), 1);
    g.inject_peak_belief("A", "a0", 1.0, true).unwrap();

    assert_eq!(g.run_message_round(), 1);
    let message = g.pending_message("A", "B").unwrap();
    assert!((message[0] - 0.9).abs() < 1e-12);
    assert!((message[1] - 0.1).abs() < 1e-12);
    assert!(g.pending_message("B", "A").is_none());

    // Uniform prior at B, so consolidation adopts the message.
    g.run_consolidation();
    let b = g.belief("B").unwrap();
    assert!((b.get("b0").unwrap() - 0.9).abs() < 1e-12);
    assert_eq!(g.node("B").unwrap().pending_messages(), 0);
}

#[test]
fn uniform_potential_carries_no_information() {
    let provider = StaticProvider::new()
        .property("A", &["a0", "a1"])
        .property("B", &["b0", "b1", "b2"])
        .prior("A", &[0.85, 0.15])
        .prior("B", &[0.2, 0.3, 0.5])
        .uniform_link("A", "B");
    let mut g = graph(&provider, &["A", "B"]);

    g.run_message_round();
    for m in g.pending_message("A", "B").unwrap() {
        assert!((m - 1.0 / 3.0).abs() < 1e-12);
    }

    g.run_consolidation();
    let b = g.belief("B").unwrap();
    assert!((b.get("b2").unwrap() - 0.5).abs() < 1e-12);
    assert!((g.belief("A").unwrap().get("a0").unwrap() - 0.85).abs() < 1e-12);
}

#[test]
fn isolated_node_only_grows_history() {
    let provider = StaticProvider::new()
        .property("A", &["a0", "a1"])
        .property("B", &["b0", "b1"])
        .property("C", &["c0", "c1", "c2"])
        .prior("C", &[0.6, 0.3, 0.1])
        .uniform_link("A", "B");
    let mut g = graph(&provider, &["A", "B", "C"]);
    assert!(g.neighbors("C").is_empty());
    let before = g.belief("C").unwrap().clone();

    let diagnostics = g.run_belief_update_cycle();
    assert_eq!(diagnostics.messages_sent, 2);

    let after = g.belief("C").unwrap();
    assert!(after.max_abs_delta(&before) < 1e-12);
    let history = g.belief_history("C").unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].max_abs_delta(&history[0]) < 1e-12);
}

#[test]
fn locked_nodes_are_invariant_under_cycles() {
    let corpus = word_order_corpus();
    let mut g = InferenceGraph::build(
        "target",
        &["81A", "85A", "GB020"],
        &corpus,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap();
    g.inject_peak_belief("81A", "VSO", 0.7, true).unwrap();
    let pinned = g.belief("81A").unwrap().clone();
    g.add_observation("81A", [("SOV", 10), ("SVO", 1)]).unwrap();

    let diagnostics = g.run_cycles(5);
    assert_eq!(diagnostics.len(), 5);
    assert_eq!(diagnostics[0].observations_skipped, 1);
    assert_eq!(g.belief("81A").unwrap(), &pinned);
    assert!((pinned.get("SOV").unwrap() - 0.15).abs() < 1e-12);
}

#[test]
fn evidence_propagates_across_namespaces() {
    let corpus = word_order_corpus();
    let mut g = InferenceGraph::build(
        "target",
        &["81A", "85A", "GB020"],
        &corpus,
        &ReferencePopulation::All,
        InferenceConfig::default(),
    )
    .unwrap();
    g.inject_peak_belief("85A", "Postp", 0.99, true).unwrap();
    g.run_cycles(3);

    let consensus = g.consensus();
    assert_eq!(consensus["81A"].value.as_str(), "SOV");
    assert_eq!(consensus["GB020"].value.as_str(), "GB020-1");
    assert!(consensus["85A"].locked);
    for belief in g.beliefs().values() {
        assert!(belief.is_normalized(1e-9));
    }
}

#[test]
fn same_seed_same_trajectory() {
    let corpus = word_order_corpus();
    let run = |seed: u64| {
        let mut g = InferenceGraph::build(
            "target",
            &["81A", "85A", "GB020"],
            &corpus,
            &ReferencePopulation::excluding("eus"),
            InferenceConfig::default().with_seed(seed),
        )
        .unwrap();
        g.add_observation("GB020", [("GB020-0", 1), ("GB020-1", 4)])
            .unwrap();
        g.run_cycles(4);
        g.beliefs()
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn run_until_stable_on_fully_locked_graph() {
    let provider = StaticProvider::new()
        .property("A", &["a0", "a1"])
        .property("B", &["b0", "b1"])
        .uniform_link("A", "B");
    let mut g = graph(&provider, &["A", "B"]);
    g.inject_peak_belief("A", "a1", 0.9, true).unwrap();
    g.inject_peak_belief("B", "b0", 0.9, true).unwrap();

    let report = g.run_until_stable(10, 1e-9).unwrap();
    assert!(report.converged);
    assert_eq!(report.cycles_run, 1);
    assert_eq!(report.final_max_delta, 0.0);

    assert!(matches!(
        g.run_until_stable(0, 1e-9),
        Err(InferenceError::Validation(_))
    ));
    assert!(g.run_until_stable(5, f64::NAN).is_err());
}

#[test]
fn zero_mass_consolidation_falls_back_to_uniform() {
    // A locked to a0 tells B "b0 only"; B's prior rules b0 out.
    let provider = StaticProvider::new()
        .property("A", &["a0", "a1"])
        .property("B", &["b0", "b1"])
        .prior("B", &[0.0, 1.0])
        .potential("A", "B", vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    let mut g = graph(&provider, &["A", "B"]);
    g.inject_peak_belief("A", "a0", 1.0, true).unwrap();
    g.run_belief_update_cycle();

    let b = g.belief("B").unwrap();
    assert_eq!(b.probabilities(), &[0.5, 0.5]);
}
