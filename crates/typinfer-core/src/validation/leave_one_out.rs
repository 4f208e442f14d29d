//! Leave-one-out evaluation of the inference engine.
//!
//! For every evaluated language `L`:
//!
//! 1. build an [`InferenceGraph`] whose priors and potentials exclude `L`;
//! 2. lock the designated observed properties to `L`'s true values at a fixed
//!    confidence;
//! 3. run a fixed number of update cycles;
//! 4. compare the arg-max belief of every unknown property with `L`'s true
//!    value, alongside a prior-only baseline (arg-max of the held-out prior).
//!
//! Epochs repeat the protocol with fresh propagation seeds. Per-language seeds
//! are derived from `(seed, epoch, language position)`, so results do not
//! depend on evaluation order or thread scheduling.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::config::InferenceConfig;
use crate::engine::errors::InferenceError;
use crate::engine::graph::InferenceGraph;
use crate::typology::{ReferencePopulation, TypologyProvider, ValueId};
use crate::validation::bootstrap::{bootstrap_mean_interval, mean, std_dev, ConfidenceInterval};

/// Harness tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationConfig {
    /// Update cycles per language.
    pub cycles: usize,
    /// Peak probability pinned on observed properties.
    pub lock_confidence: f64,
    /// Repetitions of the whole protocol with fresh seeds.
    pub epochs: usize,
    pub bootstrap_resamples: usize,
    pub confidence_level: f64,
    pub seed: u64,
    pub inference: InferenceConfig,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            cycles: 3,
            lock_confidence: 0.99,
            epochs: 1,
            bootstrap_resamples: 1000,
            confidence_level: 0.95,
            seed: 0,
            inference: InferenceConfig::default(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(self) -> Result<Self, InferenceError> {
        if self.epochs == 0 {
            return Err(InferenceError::Validation("epochs must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.lock_confidence) {
            return Err(InferenceError::Validation(
                "lock_confidence must be in [0, 1]".into(),
            ));
        }
        self.inference.validate()?;
        Ok(self)
    }
}

/// One unknown property's prediction for one language.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PropertyPrediction {
    pub property: String,
    pub truth: ValueId,
    pub predicted: ValueId,
    pub probability: f64,
    pub baseline: ValueId,
}

impl PropertyPrediction {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.truth
    }

    pub fn baseline_correct(&self) -> bool {
        self.baseline == self.truth
    }
}

/// Outcome for one held-out language in one epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LanguageEvaluation {
    pub language: String,
    pub epoch: usize,
    /// Observed properties actually locked (attested for the language).
    pub locked: usize,
    pub predictions: Vec<PropertyPrediction>,
}

impl LanguageEvaluation {
    pub fn correct(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_correct()).count()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.predictions.len())
    }

    pub fn baseline_accuracy(&self) -> f64 {
        let hits = self.predictions.iter().filter(|p| p.baseline_correct()).count();
        ratio(hits, self.predictions.len())
    }
}

/// Per-epoch micro-averaged accuracy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EpochSummary {
    pub epoch: usize,
    pub accuracy: f64,
    pub baseline_accuracy: f64,
}

/// Accuracy of one unknown property across languages and epochs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PropertyAccuracy {
    pub evaluated: usize,
    pub correct: usize,
    pub baseline_correct: usize,
}

impl PropertyAccuracy {
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.evaluated)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationReport {
    pub languages_evaluated: usize,
    /// Languages with no attested unknown property.
    pub skipped_languages: Vec<String>,
    pub epochs: Vec<EpochSummary>,
    /// Mean per-language accuracy with bootstrap interval.
    pub accuracy: ConfidenceInterval,
    pub baseline: ConfidenceInterval,
    /// Standard deviation of epoch accuracies.
    pub epoch_std_dev: f64,
    /// Ordered property pairs whose potential came from a fixed table, so the
    /// held-out language was not removed from it.
    pub population_independent_potentials: Vec<(String, String)>,
    pub per_property: BTreeMap<String, PropertyAccuracy>,
    pub evaluations: Vec<LanguageEvaluation>,
}

/// Leave-one-out harness over a shared, read-only provider.
pub struct LeaveOneOut<'a> {
    provider: &'a dyn TypologyProvider,
    observed: Vec<String>,
    unknown: Vec<String>,
    fixed_potentials: Vec<(String, String)>,
    config: ValidationConfig,
}

impl<'a> LeaveOneOut<'a> {
    pub fn new<S: AsRef<str>>(
        provider: &'a dyn TypologyProvider,
        observed: &[S],
        unknown: &[S],
        config: ValidationConfig,
    ) -> Result<Self, InferenceError> {
        let config = config.validate()?;
        let observed: Vec<String> = observed.iter().map(|s| s.as_ref().to_string()).collect();
        let unknown: Vec<String> = unknown
            .iter()
            .map(|s| s.as_ref().to_string())
            .filter(|u| !observed.contains(u))
            .collect();
        if unknown.is_empty() {
            return Err(InferenceError::Validation(
                "at least one unknown property is required".into(),
            ));
        }
        let fixed_potentials = fixed_potential_pairs(provider, observed.iter().chain(&unknown));
        if !fixed_potentials.is_empty() {
            debug!(
                pairs = fixed_potentials.len(),
                "held-out languages are not excluded from precomputed potential tables"
            );
        }
        Ok(Self {
            provider,
            observed,
            unknown,
            fixed_potentials,
            config,
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Evaluates one held-out language. `None` when the language has no
    /// attested unknown property.
    pub fn evaluate_language(
        &self,
        language: &str,
        epoch: usize,
        position: usize,
    ) -> Result<Option<LanguageEvaluation>, InferenceError> {
        let properties: Vec<&str> = self
            .observed
            .iter()
            .chain(self.unknown.iter())
            .map(String::as_str)
            .collect();
        let inference = self
            .config
            .inference
            .with_seed(derive_seed(self.config.seed, epoch as u64, position as u64));
        let mut graph = InferenceGraph::build(
            language,
            &properties,
            self.provider,
            &ReferencePopulation::excluding(language),
            inference,
        )?;

        let baseline: BTreeMap<String, ValueId> = graph
            .consensus()
            .into_iter()
            .map(|(name, c)| (name, c.value))
            .collect();

        let mut locked = 0;
        for name in &self.observed {
            let Some(property) = graph.property(name) else {
                continue;
            };
            let Some(truth) = self.provider.language_value(language, property) else {
                continue;
            };
            graph.inject_peak_belief(name, truth.as_str(), self.config.lock_confidence, true)?;
            locked += 1;
        }

        graph.run_cycles(self.config.cycles);

        let consensus = graph.consensus();
        let mut predictions = Vec::new();
        for name in &self.unknown {
            let (Some(property), Some(result)) = (graph.property(name), consensus.get(name)) else {
                continue;
            };
            let Some(truth) = self.provider.language_value(language, property) else {
                continue;
            };
            let baseline = baseline
                .get(name)
                .cloned()
                .unwrap_or_else(|| result.value.clone());
            predictions.push(PropertyPrediction {
                property: name.clone(),
                truth,
                predicted: result.value.clone(),
                probability: result.probability,
                baseline,
            });
        }

        if predictions.is_empty() {
            debug!(language, "no attested unknown property, skipping");
            return Ok(None);
        }
        Ok(Some(LanguageEvaluation {
            language: language.to_string(),
            epoch,
            locked,
            predictions,
        }))
    }

    /// Runs every epoch over `languages` (default: every known language).
    pub fn run(&self, languages: Option<&[String]>) -> Result<ValidationReport, InferenceError> {
        let ids: Vec<String> = match languages {
            Some(ids) => ids.to_vec(),
            None => self
                .provider
                .languages()
                .iter()
                .map(|l| l.id.clone())
                .collect(),
        };

        let mut evaluations = Vec::new();
        let mut epochs = Vec::with_capacity(self.config.epochs);
        let mut skipped: Vec<String> = Vec::new();
        for epoch in 0..self.config.epochs {
            let indexed: Vec<(usize, &String)> = ids.iter().enumerate().collect();
            let evaluate = |&(position, id): &(usize, &String)| {
                self.evaluate_language(id, epoch, position)
                    .map(|outcome| (id.clone(), outcome))
            };

            #[cfg(feature = "parallel")]
            let outcomes: Vec<_> = indexed.par_iter().map(evaluate).collect();
            #[cfg(not(feature = "parallel"))]
            let outcomes: Vec<_> = indexed.iter().map(evaluate).collect();

            let mut epoch_evals = Vec::new();
            for outcome in outcomes {
                match outcome? {
                    (_, Some(evaluation)) => epoch_evals.push(evaluation),
                    (id, None) if epoch == 0 => skipped.push(id),
                    _ => {}
                }
            }

            let summary = summarize_epoch(epoch, &epoch_evals);
            info!(
                epoch,
                languages = epoch_evals.len(),
                accuracy = summary.accuracy,
                baseline = summary.baseline_accuracy,
                "leave-one-out epoch complete"
            );
            epochs.push(summary);
            evaluations.extend(epoch_evals);
        }

        if evaluations.is_empty() {
            return Err(InferenceError::Validation(
                "no language had an attested unknown property".into(),
            ));
        }
        self.aggregate(evaluations, epochs, skipped)
    }

    fn aggregate(
        &self,
        evaluations: Vec<LanguageEvaluation>,
        epochs: Vec<EpochSummary>,
        skipped_languages: Vec<String>,
    ) -> Result<ValidationReport, InferenceError> {
        let mut per_language: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        let mut per_property: BTreeMap<String, PropertyAccuracy> = BTreeMap::new();
        for evaluation in &evaluations {
            let entry = per_language.entry(evaluation.language.as_str()).or_default();
            entry.0.push(evaluation.accuracy());
            entry.1.push(evaluation.baseline_accuracy());
            for prediction in &evaluation.predictions {
                let stats = per_property.entry(prediction.property.clone()).or_default();
                stats.evaluated += 1;
                stats.correct += prediction.is_correct() as usize;
                stats.baseline_correct += prediction.baseline_correct() as usize;
            }
        }

        let accuracies: Vec<f64> = per_language.values().map(|(a, _)| mean(a)).collect();
        let baselines: Vec<f64> = per_language.values().map(|(_, b)| mean(b)).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let accuracy = bootstrap_mean_interval(
            &accuracies,
            self.config.bootstrap_resamples,
            self.config.confidence_level,
            &mut rng,
        )?;
        let baseline = bootstrap_mean_interval(
            &baselines,
            self.config.bootstrap_resamples,
            self.config.confidence_level,
            &mut rng,
        )?;
        let epoch_accuracies: Vec<f64> = epochs.iter().map(|e| e.accuracy).collect();

        Ok(ValidationReport {
            languages_evaluated: per_language.len(),
            skipped_languages,
            epoch_std_dev: std_dev(&epoch_accuracies),
            population_independent_potentials: self.fixed_potentials.clone(),
            epochs,
            accuracy,
            baseline,
            per_property,
            evaluations,
        })
    }
}

/// Ordered pairs among `names` whose potential ignores the population.
fn fixed_potential_pairs<'n>(
    provider: &dyn TypologyProvider,
    names: impl Iterator<Item = &'n String>,
) -> Vec<(String, String)> {
    let resolved: Vec<_> = names
        .filter_map(|name| provider.resolve_property(name))
        .collect();
    let mut pairs = Vec::new();
    for source in &resolved {
        for target in &resolved {
            if source.name() != target.name()
                && provider.potential_ignores_population(source, target)
            {
                pairs.push((source.name().to_string(), target.name().to_string()));
            }
        }
    }
    pairs
}

fn summarize_epoch(epoch: usize, evaluations: &[LanguageEvaluation]) -> EpochSummary {
    let total: usize = evaluations.iter().map(|e| e.predictions.len()).sum();
    let correct: usize = evaluations.iter().map(LanguageEvaluation::correct).sum();
    let baseline: usize = evaluations
        .iter()
        .flat_map(|e| e.predictions.iter())
        .filter(|p| p.baseline_correct())
        .count();
    EpochSummary {
        epoch,
        accuracy: ratio(correct, total),
        baseline_accuracy: ratio(baseline, total),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// SplitMix64 mix of the base seed with epoch and language position.
pub fn derive_seed(seed: u64, epoch: u64, position: u64) -> u64 {
    let mut z = seed
        .wrapping_add(epoch.wrapping_mul(0xD1B5_4A32_D192_ED03))
        .wrapping_add(position)
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
