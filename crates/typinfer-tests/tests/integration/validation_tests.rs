//! Leave-one-out validation over the word-order corpus.

use typinfer_core::validation::{LeaveOneOut, ValidationConfig};
use typinfer_core::TypologyCorpus;
use typinfer_tests::{word_order_corpus, SAMPLE_DATASET};

fn config(seed: u64) -> ValidationConfig {
    ValidationConfig {
        bootstrap_resamples: 300,
        seed,
        ..ValidationConfig::default()
    }
}

#[test]
fn repeated_runs_are_identical_for_a_fixed_seed() {
    let corpus = word_order_corpus();
    let harness = LeaveOneOut::new(&corpus, &["85A"], &["81A", "GB020"], config(3)).unwrap();
    let first = harness.run(None).unwrap();
    let second = harness.run(None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.languages_evaluated, 12);
    assert!(first.skipped_languages.is_empty());
    assert!(first.population_independent_potentials.is_empty());
}

#[test]
fn accuracy_varies_little_across_seeds() {
    let corpus = word_order_corpus();
    let accuracies: Vec<f64> = (0..5)
        .map(|seed| {
            LeaveOneOut::new(&corpus, &["85A"], &["81A", "GB020"], config(seed))
                .unwrap()
                .run(None)
                .unwrap()
                .accuracy
                .mean
        })
        .collect();
    let min = accuracies.iter().copied().fold(f64::INFINITY, f64::min);
    let max = accuracies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min <= 0.25, "accuracies {:?}", accuracies);
}

#[test]
fn propagation_beats_the_prior_baseline_on_word_order() {
    let corpus = word_order_corpus();
    let harness = LeaveOneOut::new(&corpus, &["85A"], &["81A"], config(1)).unwrap();
    let report = harness.run(None).unwrap();

    let order = report.per_property["81A"];
    assert_eq!(order.evaluated, 12);
    assert!(order.correct > order.baseline_correct);
    assert!(report.accuracy.mean > report.baseline.mean);
    assert!(report.accuracy.lower <= report.accuracy.mean);
    assert!(report.accuracy.mean <= report.accuracy.upper);
}

#[test]
fn epochs_repeat_the_protocol() {
    let corpus = word_order_corpus();
    let config = ValidationConfig {
        epochs: 3,
        ..config(9)
    };
    let harness = LeaveOneOut::new(&corpus, &["85A"], &["81A"], config).unwrap();
    let languages: Vec<String> = ["jpn", "eng", "tgl"].iter().map(|s| s.to_string()).collect();
    let report = harness.run(Some(&languages)).unwrap();

    assert_eq!(report.epochs.len(), 3);
    assert_eq!(report.evaluations.len(), 9);
    assert_eq!(report.languages_evaluated, 3);
    assert!(report.epoch_std_dev >= 0.0);
    let held_out: Vec<&str> = report.evaluations[..3]
        .iter()
        .map(|e| e.language.as_str())
        .collect();
    assert_eq!(held_out, vec!["jpn", "eng", "tgl"]);
}

#[test]
fn languages_without_truth_are_skipped() {
    let corpus = word_order_corpus();
    let harness = LeaveOneOut::new(&corpus, &["85A"], &["81A"], config(0)).unwrap();
    let languages = vec!["jpn".to_string(), "xxx".to_string()];
    let report = harness.run(Some(&languages)).unwrap();
    assert_eq!(report.languages_evaluated, 1);
    assert_eq!(report.skipped_languages, vec!["xxx"]);
}

#[test]
fn invalid_validation_config_is_rejected() {
    let corpus = word_order_corpus();
    let zero_epochs = ValidationConfig {
        epochs: 0,
        ..ValidationConfig::default()
    };
    assert!(LeaveOneOut::new(&corpus, &["85A"], &["81A"], zero_epochs).is_err());
}

#[test]
fn report_serializes_to_json() {
    let corpus = word_order_corpus();
    let harness = LeaveOneOut::new(&corpus, &["85A"], &["81A"], config(2)).unwrap();
    let languages = vec!["jpn".to_string()];
    let report = harness.run(Some(&languages)).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["languages_evaluated"], 1);
    assert_eq!(json["evaluations"][0]["language"], "jpn");
    assert_eq!(json["evaluations"][0]["predictions"][0]["truth"], "SOV");
    assert!(json["accuracy"]["upper"].is_number());
}

#[test]
fn report_flags_potentials_that_keep_the_held_out_language() {
    let corpus = TypologyCorpus::from_json_str(SAMPLE_DATASET).unwrap();
    let harness = LeaveOneOut::new(&corpus, &["81A"], &["GB020"], config(4)).unwrap();
    let languages = vec!["jpn".to_string()];
    let report = harness.run(Some(&languages)).unwrap();

    assert_eq!(report.languages_evaluated, 1);
    assert_eq!(
        report.population_independent_potentials,
        vec![("81A".to_string(), "GB020".to_string())]
    );
}
