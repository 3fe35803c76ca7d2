//! Per-track scaling strategies.
//!
//! Every strategy takes a sample-major matrix (frames as rows, dimensions as
//! columns), fits itself on that track alone and collapses the frame axis to
//! one value per dimension. Nothing is carried between calls.

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FeatureGroup;

/// Relative spread below which a dimension is treated as constant. The
/// spread of a column is compared against `DEGENERATE_EPSILON * max(|min|, |max|, 1)`.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

pub const DEFAULT_MIN_MAX_RANGE: (f64, f64) = (-1.0, 1.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    IdentityMean,
    StandardScore,
    MinMax,
    L2Normalize,
}

impl ScalingStrategy {
    pub fn name(self) -> &'static str {
        match self {
            ScalingStrategy::IdentityMean => "identity_mean",
            ScalingStrategy::StandardScore => "standard_score",
            ScalingStrategy::MinMax => "min_max",
            ScalingStrategy::L2Normalize => "l2_normalize",
        }
    }

    /// Check orientation, then run the strategy this tag names.
    pub fn apply(
        self,
        group: FeatureGroup,
        samples: ArrayView2<'_, f64>,
        expected_dims: usize,
        options: &ScalingOptions,
    ) -> Result<Scaled> {
        if samples.ncols() != expected_dims {
            return Err(Error::ShapeMismatch {
                group,
                axis: "columns",
                expected: expected_dims,
                actual: samples.ncols(),
            });
        }
        if samples.nrows() == 0 {
            return Err(Error::EmptyInput(group));
        }

        let scaled = match self {
            ScalingStrategy::IdentityMean => Scaled::exact(identity_mean(samples)),
            ScalingStrategy::StandardScore => standard_score(samples),
            ScalingStrategy::MinMax => min_max(samples, options.min_max_range()),
            ScalingStrategy::L2Normalize => Scaled::exact(l2_normalize(samples)),
        };
        Ok(scaled)
    }
}

impl fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingOptions {
    min_max_range: (f64, f64),
}

impl ScalingOptions {
    pub fn new(min_max_range: (f64, f64)) -> Result<Self> {
        let (lower, upper) = min_max_range;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(Error::InvalidRange { lower, upper });
        }
        Ok(Self { min_max_range })
    }

    /// Target interval for `min_max`, `(lower, upper)`.
    pub fn min_max_range(&self) -> (f64, f64) {
        self.min_max_range
    }
}

impl Default for ScalingOptions {
    fn default() -> Self {
        Self {
            min_max_range: DEFAULT_MIN_MAX_RANGE,
        }
    }
}

/// Strategy output plus the dimensions that hit a degenerate fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaled {
    pub values: Vec<f64>,
    pub degenerate: Vec<usize>,
}

impl Scaled {
    fn exact(values: Vec<f64>) -> Self {
        Self {
            values,
            degenerate: Vec::new(),
        }
    }
}

pub(crate) fn identity_mean(samples: ArrayView2<'_, f64>) -> Vec<f64> {
    samples
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(samples.ncols()))
        .to_vec()
}

/// Population z-score per column, then the column mean. A constant column
/// yields `0.0`.
pub(crate) fn standard_score(samples: ArrayView2<'_, f64>) -> Scaled {
    reduce_columns(samples, 0.0, |column| {
        if is_constant(column) {
            return None;
        }
        let n = column.len() as f64;
        let mean = column.sum() / n;
        let std = (column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
        if std == 0.0 {
            return None;
        }
        Some(column.iter().map(|x| (x - mean) / std).sum::<f64>() / n)
    })
}

/// Rescale each column from its own `[min, max]` into `range`, then average.
/// A constant column yields the midpoint of `range`.
pub(crate) fn min_max(samples: ArrayView2<'_, f64>, range: (f64, f64)) -> Scaled {
    let (lower, upper) = range;
    let midpoint = (lower + upper) / 2.0;
    reduce_columns(samples, midpoint, |column| {
        if is_constant(column) {
            return None;
        }
        let n = column.len() as f64;
        let (min, max) = extent(column);
        let span = max - min;
        let scaled_sum: f64 = column
            .iter()
            .map(|x| (x - min) / span * (upper - lower) + lower)
            .sum();
        Some(scaled_sum / n)
    })
}

fn extent(column: ArrayView1<'_, f64>) -> (f64, f64) {
    column
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Decided on the raw values so a rounded mean cannot fake a spread.
fn is_constant(column: ArrayView1<'_, f64>) -> bool {
    let (min, max) = extent(column);
    let scale = min.abs().max(max.abs()).max(1.0);
    max - min <= DEGENERATE_EPSILON * scale
}

/// Mean of the row-normalized matrix from [`l2_rows`].
pub(crate) fn l2_normalize(samples: ArrayView2<'_, f64>) -> Vec<f64> {
    identity_mean(l2_rows(samples).view())
}

/// Scale every row to unit L2 norm. All-zero rows stay zero.
pub(crate) fn l2_rows(samples: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut rows = samples.to_owned();
    for mut row in rows.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > DEGENERATE_EPSILON {
            row.mapv_inplace(|x| x / norm);
        }
    }
    rows
}

fn reduce_columns<F>(samples: ArrayView2<'_, f64>, fallback: f64, reduce: F) -> Scaled
where
    F: Fn(ArrayView1<'_, f64>) -> Option<f64>,
{
    let mut scaled = Scaled::exact(Vec::with_capacity(samples.ncols()));
    for (dim, column) in samples.axis_iter(Axis(1)).enumerate() {
        match reduce(column) {
            Some(value) => scaled.values.push(value),
            None => {
                scaled.values.push(fallback);
                scaled.degenerate.push(dim);
            }
        }
    }
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identity_mean_averages_frames() {
        let samples = array![[1.0, 10.0], [3.0, 20.0]];
        assert_eq!(identity_mean(samples.view()), vec![2.0, 15.0]);
    }

    #[test]
    fn standard_score_constant_column_falls_back_to_zero() {
        let samples = array![[5.0, 1.0], [5.0, 2.0], [5.0, 6.0]];
        let scaled = standard_score(samples.view());
        assert_eq!(scaled.values[0], 0.0);
        assert_eq!(scaled.degenerate, vec![0]);
        assert!(scaled.values[1].abs() < 1e-12);
    }

    #[test]
    fn large_constant_columns_are_degenerate() {
        // Rounding in sum()/n must not turn a constant into a +-1 z-score.
        for value in [2000.123, 3000.7, 1_234_567.891] {
            let samples = Array2::from_elem((1293, 1), value);
            let scaled = standard_score(samples.view());
            assert_eq!(scaled.values, vec![0.0], "{value}");
            assert_eq!(scaled.degenerate, vec![0], "{value}");

            let scaled = min_max(samples.view(), DEFAULT_MIN_MAX_RANGE);
            assert_eq!(scaled.values, vec![0.0], "{value}");
            assert_eq!(scaled.degenerate, vec![0], "{value}");
        }
    }

    #[test]
    fn apply_rejects_zero_frames() {
        let empty = Array2::<f64>::zeros((0, 2));
        for strategy in [
            ScalingStrategy::IdentityMean,
            ScalingStrategy::StandardScore,
            ScalingStrategy::MinMax,
            ScalingStrategy::L2Normalize,
        ] {
            let err = strategy
                .apply(FeatureGroup::SpectralCentroid, empty.view(), 2, &ScalingOptions::default())
                .unwrap_err();
            assert_eq!(err, Error::EmptyInput(FeatureGroup::SpectralCentroid));
        }
    }

    #[test]
    fn min_max_uses_track_range() {
        // Column rescales to -1, 0, 1 -> mean 0. Second: -1, -1, 1 -> mean -1/3.
        let samples = array![[0.0, 2.0], [5.0, 2.0], [10.0, 8.0]];
        let scaled = min_max(samples.view(), DEFAULT_MIN_MAX_RANGE);
        assert!(scaled.values[0].abs() < 1e-12);
        assert!((scaled.values[1] + 1.0 / 3.0).abs() < 1e-12);
        assert!(scaled.degenerate.is_empty());
    }

    #[test]
    fn min_max_constant_column_yields_midpoint() {
        let samples = Array2::from_elem((40, 3), 7.25);
        let scaled = min_max(samples.view(), (0.0, 10.0));
        assert_eq!(scaled.values, vec![5.0; 3]);
        assert_eq!(scaled.degenerate, vec![0, 1, 2]);
    }

    #[test]
    fn l2_rows_have_unit_norm() {
        let samples = array![[3.0, 4.0], [1.0, 1.0], [0.0, 0.0], [-2.0, 0.0]];
        let rows = l2_rows(samples.view());
        for (i, row) in rows.axis_iter(Axis(0)).enumerate() {
            let norm = row.dot(&row).sqrt();
            if i == 2 {
                assert_eq!(norm, 0.0);
            } else {
                assert!((norm - 1.0).abs() < 1e-12);
            }
        }
        assert_eq!(rows.row(0).to_vec(), vec![0.6, 0.8]);
    }

    #[test]
    fn output_length_tracks_columns_not_frames() {
        for frames in [1, 7, 250] {
            let samples = Array2::from_shape_fn((frames, 13), |(i, j)| (i * j) as f64);
            for strategy in [
                ScalingStrategy::IdentityMean,
                ScalingStrategy::StandardScore,
                ScalingStrategy::MinMax,
                ScalingStrategy::L2Normalize,
            ] {
                let scaled = strategy
                    .apply(FeatureGroup::Mfcc, samples.view(), 13, &ScalingOptions::default())
                    .unwrap();
                assert_eq!(scaled.values.len(), 13, "{strategy} with {frames} frames");
                assert!(scaled.values.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn apply_rejects_dimension_major_input() {
        let dimension_major = Array2::<f64>::zeros((6, 100));
        let err = ScalingStrategy::MinMax
            .apply(
                FeatureGroup::Tonnetz,
                dimension_major.view(),
                6,
                &ScalingOptions::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                group: FeatureGroup::Tonnetz,
                axis: "columns",
                expected: 6,
                actual: 100,
            }
        );
    }

    #[test]
    fn options_reject_inverted_range() {
        assert_eq!(
            ScalingOptions::new((1.0, -1.0)).unwrap_err(),
            Error::InvalidRange { lower: 1.0, upper: -1.0 }
        );
        let options = ScalingOptions::new((0.0, 1.0)).unwrap();
        assert_eq!(options.min_max_range(), (0.0, 1.0));
        assert_eq!(ScalingOptions::default().min_max_range(), DEFAULT_MIN_MAX_RANGE);
    }
}
