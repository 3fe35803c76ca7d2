//! Seven-statistic reduction of raw per-frame features.
//!
//! Conventions: population standard deviation, biased Fisher-Pearson skew and
//! biased excess kurtosis. A constant dimension has no shape: its std, skew
//! and kurtosis are reported as `0.0` and its mean is the value itself.

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{FeatureGroup, RawFeatureSet};

pub const STATISTIC_NAMES: [&str; 7] = ["mean", "std", "skew", "kurtosis", "median", "min", "max"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub skew: Vec<f64>,
    pub kurtosis: Vec<f64>,
    pub median: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl SummaryStatistics {
    /// Reduce a sample-major matrix (frames as rows) column by column.
    /// Callers guarantee at least one row; [`RawFeatureSet`] rejects
    /// zero-frame tracks.
    pub(crate) fn from_samples(samples: ArrayView2<'_, f64>) -> Self {
        let mut stats = Self::with_capacity(samples.ncols());
        for column in samples.axis_iter(Axis(1)) {
            stats.push_column(column);
        }
        stats
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            mean: Vec::with_capacity(n),
            std: Vec::with_capacity(n),
            skew: Vec::with_capacity(n),
            kurtosis: Vec::with_capacity(n),
            median: Vec::with_capacity(n),
            min: Vec::with_capacity(n),
            max: Vec::with_capacity(n),
        }
    }

    fn push_column(&mut self, column: ArrayView1<'_, f64>) {
        let mut sorted = column.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (min, max) = (sorted[0], sorted[sorted.len() - 1]);

        // Constancy is decided on the values, not on a rounded variance.
        let (mean, std, skew, kurtosis) = if min == max {
            (min, 0.0, 0.0, 0.0)
        } else {
            let n = column.len() as f64;
            let mean = column.sum() / n;
            let moment = |k: i32| column.iter().map(|x| (x - mean).powi(k)).sum::<f64>() / n;
            let m2 = moment(2);
            if m2 > 0.0 {
                let skew = moment(3) / m2.powf(1.5);
                let kurtosis = moment(4) / (m2 * m2) - 3.0;
                (mean, m2.sqrt(), skew, kurtosis)
            } else {
                (mean, 0.0, 0.0, 0.0)
            }
        };

        self.mean.push(mean);
        self.std.push(std);
        self.skew.push(skew);
        self.kurtosis.push(kurtosis);
        self.median.push(median_of_sorted(&sorted));
        self.min.push(min);
        self.max.push(max);
    }

    /// Statistics in [`STATISTIC_NAMES`] order.
    pub fn by_name(&self) -> [(&'static str, &[f64]); 7] {
        [
            ("mean", self.mean.as_slice()),
            ("std", self.std.as_slice()),
            ("skew", self.skew.as_slice()),
            ("kurtosis", self.kurtosis.as_slice()),
            ("median", self.median.as_slice()),
            ("min", self.min.as_slice()),
            ("max", self.max.as_slice()),
        ]
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummarizedFeatures {
    pub mfcc: SummaryStatistics,
    pub sf: SummaryStatistics,
    pub sc: SummaryStatistics,
    pub sr: SummaryStatistics,
    pub tonnetz: SummaryStatistics,
}

impl SummarizedFeatures {
    pub fn get(&self, group: FeatureGroup) -> &SummaryStatistics {
        match group {
            FeatureGroup::Mfcc => &self.mfcc,
            FeatureGroup::SpectralFlatness => &self.sf,
            FeatureGroup::SpectralCentroid => &self.sc,
            FeatureGroup::SpectralRolloff => &self.sr,
            FeatureGroup::Tonnetz => &self.tonnetz,
        }
    }

    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::new();
        for group in FeatureGroup::ALL {
            for (_, values) in self.get(group).by_name() {
                row.extend_from_slice(values);
            }
        }
        row
    }

    pub fn column_names(n_mfcc: usize) -> Vec<String> {
        let mut names = Vec::new();
        for group in FeatureGroup::ALL {
            for stat in STATISTIC_NAMES {
                for d in 0..group.expected_dims(n_mfcc) {
                    names.push(format!("{}_{}_{}", group.short_name(), stat, d));
                }
            }
        }
        names
    }
}

/// Summarize every group of a track. Consumes the raw set.
pub fn summarize(raw: RawFeatureSet) -> SummarizedFeatures {
    let stats = |group: FeatureGroup| SummaryStatistics::from_samples(raw.get(group).samples());
    log::debug!("Summarizing {} frames", raw.frames());
    SummarizedFeatures {
        mfcc: stats(FeatureGroup::Mfcc),
        sf: stats(FeatureGroup::SpectralFlatness),
        sc: stats(FeatureGroup::SpectralCentroid),
        sr: stats(FeatureGroup::SpectralRolloff),
        tonnetz: stats(FeatureGroup::Tonnetz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMatrix;
    use ndarray::array;

    #[test]
    fn constant_matrix_has_flat_statistics() {
        let m = FeatureMatrix::constant(3, 10, 4.5);
        let s = SummaryStatistics::from_samples(m.samples());
        assert_eq!(s.mean, vec![4.5; 3]);
        assert_eq!(s.median, vec![4.5; 3]);
        assert_eq!(s.min, vec![4.5; 3]);
        assert_eq!(s.max, vec![4.5; 3]);
        assert_eq!(s.std, vec![0.0; 3]);
        assert_eq!(s.skew, vec![0.0; 3]);
        assert_eq!(s.kurtosis, vec![0.0; 3]);
    }

    #[test]
    fn large_constant_has_no_spread_or_shape() {
        // 2000.123 is not representable; sum()/n drifts a few ulps from it.
        for value in [2000.123, 3000.7, 1_234_567.891] {
            let m = FeatureMatrix::constant(1, 1293, value);
            let s = SummaryStatistics::from_samples(m.samples());
            assert_eq!(s.mean, vec![value]);
            assert_eq!(s.std, vec![0.0]);
            assert_eq!(s.skew, vec![0.0]);
            assert_eq!(s.kurtosis, vec![0.0]);
            assert_eq!(s.median, vec![value]);
        }
    }

    #[test]
    fn matches_reference_moments() {
        // One column, frames 1, 2, 3, 4, 10.
        let samples = array![[1.0], [2.0], [3.0], [4.0], [10.0]];
        let s = SummaryStatistics::from_samples(samples.view());
        assert!((s.mean[0] - 4.0).abs() < 1e-12);
        assert!((s.std[0] - 10.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.median[0], 3.0);
        // m2 = 10, m3 = 36, m4 = 278.8
        assert!((s.skew[0] - 36.0 / 10.0f64.powf(1.5)).abs() < 1e-12);
        assert!((s.kurtosis[0] - (2.788 - 3.0)).abs() < 1e-12);
    }

    #[test]
    fn even_length_median_averages_middle_pair() {
        let samples = array![[4.0], [1.0], [3.0], [2.0]];
        let s = SummaryStatistics::from_samples(samples.view());
        assert_eq!(s.median[0], 2.5);
        assert_eq!(s.min[0], 1.0);
        assert_eq!(s.max[0], 4.0);
    }

    #[test]
    fn column_names_cover_every_statistic() {
        let names = SummarizedFeatures::column_names(13);
        assert_eq!(names.len(), 7 * (13 + 1 + 1 + 1 + 6));
        assert_eq!(names[0], "mfcc_mean_0");
        assert_eq!(names[13], "mfcc_std_0");
        assert_eq!(names.last().map(String::as_str), Some("tonnetz_max_5"));
    }
}
