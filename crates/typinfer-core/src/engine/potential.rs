//! Pairwise potentials between properties.
//!
//! A [`Potential`] for the ordered pair (source, target) is a row-stochastic
//! matrix with `matrix[a][b] ≈ P(target = b | source = a)`, rows indexed by the
//! source property's value order and columns by the target's. Rows are
//! normalized on construction; an all-zero row becomes uniform, which encodes
//! "no information" for that source value.

use crate::engine::belief::normalize_or_uniform;
use crate::engine::errors::InferenceError;

/// Row-stochastic conditional probability matrix, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    source_len: usize,
    target_len: usize,
    matrix: Vec<f64>,
}

impl Potential {
    /// Builds a potential from raw rows (weights or counts), normalizing each row.
    ///
    /// Fails if the rows are ragged, empty, or contain negative/non-finite entries.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, InferenceError> {
        let source_len = rows.len();
        let target_len = rows.first().map(Vec::len).unwrap_or(0);
        if source_len == 0 || target_len == 0 {
            return Err(InferenceError::Dataset(
                "potential must have at least one row and one column".into(),
            ));
        }

        let mut matrix = Vec::with_capacity(source_len * target_len);
        for (a, row) in rows.into_iter().enumerate() {
            if row.len() != target_len {
                return Err(InferenceError::Dataset(format!(
                    "potential row {} has {} columns, expected {}",
                    a,
                    row.len(),
                    target_len
                )));
            }
            if let Some(bad) = row.iter().find(|w| !w.is_finite() || **w < 0.0) {
                return Err(InferenceError::Numerical(format!(
                    "potential row {} has invalid entry {}",
                    a, bad
                )));
            }
            matrix.extend(row);
        }

        let mut potential = Self {
            source_len,
            target_len,
            matrix,
        };
        potential.normalize_rows();
        Ok(potential)
    }

    /// Information-free potential: every row uniform.
    pub fn uniform(source_len: usize, target_len: usize) -> Self {
        let p = if target_len == 0 {
            0.0
        } else {
            1.0 / target_len as f64
        };
        Self {
            source_len,
            target_len,
            matrix: vec![p; source_len * target_len],
        }
    }

    fn normalize_rows(&mut self) {
        for row in self.matrix.chunks_mut(self.target_len) {
            normalize_or_uniform(row);
        }
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// `P(target = b | source = a)` by value index.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.matrix[a * self.target_len + b]
    }

    pub fn row(&self, a: usize) -> &[f64] {
        &self.matrix[a * self.target_len..(a + 1) * self.target_len]
    }

    /// Whether every row sums to 1 within `tolerance`.
    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        self.matrix
            .chunks(self.target_len)
            .all(|row| (row.iter().sum::<f64>() - 1.0).abs() <= tolerance)
    }

    /// Unnormalized `Σ_a weights[a] · P[a][b]` for every target value `b`.
    pub(crate) fn propagate(&self, weights: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.target_len];
        for (a, &w) in weights.iter().enumerate().take(self.source_len) {
            if w == 0.0 {
                continue;
            }
            for (slot, &p) in out.iter_mut().zip(self.row(a)) {
                *slot += w * p;
            }
        }
        out
    }
}
