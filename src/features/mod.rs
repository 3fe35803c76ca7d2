//! Per-track feature containers.
//!
//! Raw features are stored dimension-major, `(dimension, frame)`, which is how
//! the extractor produces them. Scaling strategies consume the transposed,
//! sample-major view returned by [`FeatureMatrix::samples`].

pub mod summary;

use std::fmt;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use summary::{summarize, SummarizedFeatures, SummaryStatistics};

pub const DEFAULT_N_MFCC: usize = 13;
pub const TONNETZ_DIMS: usize = 6;
pub const DEFAULT_MAX_FRAMES: usize = 200_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    Mfcc,
    #[serde(rename = "sf")]
    SpectralFlatness,
    #[serde(rename = "sc")]
    SpectralCentroid,
    #[serde(rename = "sr")]
    SpectralRolloff,
    Tonnetz,
}

impl FeatureGroup {
    /// Column order used everywhere a set is flattened.
    pub const ALL: [FeatureGroup; 5] = [
        FeatureGroup::Mfcc,
        FeatureGroup::SpectralFlatness,
        FeatureGroup::SpectralCentroid,
        FeatureGroup::SpectralRolloff,
        FeatureGroup::Tonnetz,
    ];

    pub fn index(self) -> usize {
        match self {
            FeatureGroup::Mfcc => 0,
            FeatureGroup::SpectralFlatness => 1,
            FeatureGroup::SpectralCentroid => 2,
            FeatureGroup::SpectralRolloff => 3,
            FeatureGroup::Tonnetz => 4,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            FeatureGroup::Mfcc => "mfcc",
            FeatureGroup::SpectralFlatness => "sf",
            FeatureGroup::SpectralCentroid => "sc",
            FeatureGroup::SpectralRolloff => "sr",
            FeatureGroup::Tonnetz => "tonnetz",
        }
    }

    /// Number of dimensions this group must have. Only MFCC is configurable.
    pub fn expected_dims(self, n_mfcc: usize) -> usize {
        match self {
            FeatureGroup::Mfcc => n_mfcc,
            FeatureGroup::Tonnetz => TONNETZ_DIMS,
            _ => 1,
        }
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Shape constraints applied when a [`RawFeatureSet`] is assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeSpec {
    pub n_mfcc: usize,
    pub max_frames: usize,
}

impl Default for ShapeSpec {
    fn default() -> Self {
        Self {
            n_mfcc: DEFAULT_N_MFCC,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

/// A single feature group, stored as `(dimension, frame)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_dimension_major(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build a matrix from one `Vec` per dimension. Rows must share a length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> std::result::Result<Self, ndarray::ShapeError> {
        let dims = rows.len();
        let frames = rows.first().map_or(0, Vec::len);
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((dims, frames), flat).map(Self::from_dimension_major)
    }

    /// A matrix where every cell holds `value`.
    pub fn constant(dims: usize, frames: usize, value: f64) -> Self {
        Self::from_dimension_major(Array2::from_elem((dims, frames), value))
    }

    pub fn dims(&self) -> usize {
        self.data.nrows()
    }

    pub fn frames(&self) -> usize {
        self.data.ncols()
    }

    pub fn dimension_major(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Sample-major view: frames as rows, dimensions as columns.
    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.data.t()
    }
}

/// The five per-frame matrices of one track. All share a frame count.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFeatureSet {
    groups: [FeatureMatrix; 5],
    n_mfcc: usize,
}

impl RawFeatureSet {
    pub fn new(
        mfcc: FeatureMatrix,
        sf: FeatureMatrix,
        sc: FeatureMatrix,
        sr: FeatureMatrix,
        tonnetz: FeatureMatrix,
        spec: ShapeSpec,
    ) -> Result<Self> {
        let groups = [mfcc, sf, sc, sr, tonnetz];
        validate(&groups, spec)?;
        Ok(Self {
            groups,
            n_mfcc: spec.n_mfcc,
        })
    }

    pub fn builder() -> RawFeatureSetBuilder {
        RawFeatureSetBuilder::default()
    }

    pub fn get(&self, group: FeatureGroup) -> &FeatureMatrix {
        &self.groups[group.index()]
    }

    pub fn frames(&self) -> usize {
        self.groups[0].frames()
    }

    pub fn n_mfcc(&self) -> usize {
        self.n_mfcc
    }
}

fn validate(groups: &[FeatureMatrix; 5], spec: ShapeSpec) -> Result<()> {
    let frames = groups[0].frames();
    for group in FeatureGroup::ALL {
        let matrix = &groups[group.index()];
        let expected = group.expected_dims(spec.n_mfcc);
        if matrix.dims() != expected {
            return Err(Error::ShapeMismatch {
                group,
                axis: "dimensions",
                expected,
                actual: matrix.dims(),
            });
        }
        if matrix.frames() == 0 {
            return Err(Error::EmptyInput(group));
        }
        if matrix.frames() > spec.max_frames {
            return Err(Error::DimensionLimit {
                group,
                frames: matrix.frames(),
                limit: spec.max_frames,
            });
        }
        if matrix.frames() != frames {
            return Err(Error::ShapeMismatch {
                group,
                axis: "frames",
                expected: frames,
                actual: matrix.frames(),
            });
        }
    }
    Ok(())
}

/// Collects groups one at a time; used when groups arrive from separate
/// producers and any of them may be absent.
#[derive(Debug, Default)]
pub struct RawFeatureSetBuilder {
    groups: [Option<FeatureMatrix>; 5],
}

impl RawFeatureSetBuilder {
    pub fn group(mut self, group: FeatureGroup, matrix: FeatureMatrix) -> Self {
        self.groups[group.index()] = Some(matrix);
        self
    }

    pub fn build(self, spec: ShapeSpec) -> Result<RawFeatureSet> {
        let [mfcc, sf, sc, sr, tonnetz] = self.groups;
        let take = |m: Option<FeatureMatrix>, group| m.ok_or(Error::MissingInput(group));
        RawFeatureSet::new(
            take(mfcc, FeatureGroup::Mfcc)?,
            take(sf, FeatureGroup::SpectralFlatness)?,
            take(sc, FeatureGroup::SpectralCentroid)?,
            take(sr, FeatureGroup::SpectralRolloff)?,
            take(tonnetz, FeatureGroup::Tonnetz)?,
            spec,
        )
    }
}

/// One aggregate per dimension for each group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatureSet {
    pub mfcc: Vec<f64>,
    pub sf: Vec<f64>,
    pub sc: Vec<f64>,
    pub sr: Vec<f64>,
    pub tonnetz: Vec<f64>,
}

impl NormalizedFeatureSet {
    pub fn get(&self, group: FeatureGroup) -> &[f64] {
        match group {
            FeatureGroup::Mfcc => &self.mfcc,
            FeatureGroup::SpectralFlatness => &self.sf,
            FeatureGroup::SpectralCentroid => &self.sc,
            FeatureGroup::SpectralRolloff => &self.sr,
            FeatureGroup::Tonnetz => &self.tonnetz,
        }
    }

    /// Flattened in [`FeatureGroup::ALL`] order.
    pub fn to_row(&self) -> Vec<f64> {
        FeatureGroup::ALL
            .iter()
            .flat_map(|&g| self.get(g).iter().copied())
            .collect()
    }

    pub fn column_names(n_mfcc: usize) -> Vec<String> {
        FeatureGroup::ALL
            .iter()
            .flat_map(|&g| {
                (0..g.expected_dims(n_mfcc)).map(move |d| format!("{}_{}", g.short_name(), d))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_set(frames: usize) -> [FeatureMatrix; 5] {
        [
            FeatureMatrix::constant(13, frames, 2.0),
            FeatureMatrix::constant(1, frames, 0.5),
            FeatureMatrix::constant(1, frames, 0.5),
            FeatureMatrix::constant(1, frames, 0.5),
            FeatureMatrix::constant(6, frames, -1.0),
        ]
    }

    #[test]
    fn accepts_consistent_groups() {
        let [a, b, c, d, e] = constant_set(100);
        let raw = RawFeatureSet::new(a, b, c, d, e, ShapeSpec::default()).unwrap();
        assert_eq!(raw.frames(), 100);
        assert_eq!(raw.get(FeatureGroup::Tonnetz).dims(), 6);
    }

    #[test]
    fn rejects_frame_count_disagreement() {
        let [a, b, c, _, e] = constant_set(100);
        let d = FeatureMatrix::constant(1, 99, 0.5);
        let err = RawFeatureSet::new(a, b, c, d, e, ShapeSpec::default()).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                group: FeatureGroup::SpectralRolloff,
                axis: "frames",
                expected: 100,
                actual: 99,
            }
        );
    }

    #[test]
    fn rejects_sample_major_input() {
        let [a, b, c, d, _] = constant_set(100);
        let transposed = FeatureMatrix::constant(100, 6, -1.0);
        let err = RawFeatureSet::new(a, b, c, d, transposed, ShapeSpec::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { group: FeatureGroup::Tonnetz, axis: "dimensions", .. }
        ));
    }

    #[test]
    fn rejects_empty_and_oversized_tracks() {
        let [a, b, c, d, e] = constant_set(0);
        let err = RawFeatureSet::new(a, b, c, d, e, ShapeSpec::default()).unwrap_err();
        assert_eq!(err, Error::EmptyInput(FeatureGroup::Mfcc));

        let [a, b, c, d, e] = constant_set(50);
        let spec = ShapeSpec { max_frames: 10, ..ShapeSpec::default() };
        let err = RawFeatureSet::new(a, b, c, d, e, spec).unwrap_err();
        assert!(matches!(err, Error::DimensionLimit { frames: 50, limit: 10, .. }));
    }

    #[test]
    fn builder_reports_missing_group() {
        let [a, b, c, d, _] = constant_set(10);
        let err = RawFeatureSet::builder()
            .group(FeatureGroup::Mfcc, a)
            .group(FeatureGroup::SpectralFlatness, b)
            .group(FeatureGroup::SpectralCentroid, c)
            .group(FeatureGroup::SpectralRolloff, d)
            .build(ShapeSpec::default())
            .unwrap_err();
        assert_eq!(err, Error::MissingInput(FeatureGroup::Tonnetz));
    }

    #[test]
    fn samples_view_is_transposed() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let s = m.samples();
        assert_eq!(s.dim(), (3, 2));
        assert_eq!(s[[2, 1]], 6.0);
    }

    #[test]
    fn column_names_follow_group_order() {
        let names = NormalizedFeatureSet::column_names(2);
        assert_eq!(
            names,
            vec![
                "mfcc_0", "mfcc_1", "sf_0", "sc_0", "sr_0", "tonnetz_0", "tonnetz_1",
                "tonnetz_2", "tonnetz_3", "tonnetz_4", "tonnetz_5"
            ]
        );
    }
}
