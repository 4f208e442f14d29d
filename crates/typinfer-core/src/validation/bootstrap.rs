//! Percentile bootstrap statistics.

use rand::Rng;

use crate::engine::errors::InferenceError;

/// Mean of a sample with a percentile-bootstrap confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    /// Confidence level, e.g. 0.95.
    pub level: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }
}

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Sample standard deviation (n − 1 denominator); 0 for fewer than two samples.
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let var = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    var.sqrt()
}

/// Resamples `samples` with replacement `resamples` times and reports the
/// `(1 − level) / 2` and `(1 + level) / 2` percentiles of the resampled means.
pub fn bootstrap_mean_interval<R: Rng + ?Sized>(
    samples: &[f64],
    resamples: usize,
    level: f64,
    rng: &mut R,
) -> Result<ConfidenceInterval, InferenceError> {
    if samples.is_empty() {
        return Err(InferenceError::Validation(
            "bootstrap needs at least one sample".into(),
        ));
    }
    if resamples == 0 {
        return Err(InferenceError::Validation("resamples must be > 0".into()));
    }
    if !(level > 0.0 && level < 1.0) {
        return Err(InferenceError::Validation(
            "confidence level must be in (0, 1)".into(),
        ));
    }

    let n = samples.len();
    let mut means: Vec<f64> = (0..resamples)
        .map(|_| {
            let total: f64 = (0..n).map(|_| samples[rng.gen_range(0..n)]).sum();
            total / n as f64
        })
        .collect();
    means.sort_by(f64::total_cmp);

    let alpha = (1.0 - level) / 2.0;
    Ok(ConfidenceInterval {
        mean: mean(samples),
        lower: percentile(&means, alpha),
        upper: percentile(&means, 1.0 - alpha),
        level,
    })
}

/// Nearest-rank percentile of sorted data.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}
