use thiserror::Error;

use crate::features::FeatureGroup;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions for a single track. Recoverable conditions (unknown
/// policy, degenerate dimensions) are reported as
/// [`NormalizationWarning`](crate::normalize::NormalizationWarning) instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("{group}: expected {expected} {axis}, got {actual}")]
    ShapeMismatch {
        group: FeatureGroup,
        axis: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("feature group '{0}' is missing")]
    MissingInput(FeatureGroup),
    #[error("{0}: matrix has no frames")]
    EmptyInput(FeatureGroup),
    #[error("{group}: {frames} frames exceeds the limit of {limit}")]
    DimensionLimit {
        group: FeatureGroup,
        frames: usize,
        limit: usize,
    },
    #[error("invalid min-max range [{lower}, {upper}]")]
    InvalidRange { lower: f64, upper: f64 },
    #[error("unknown policy table revision {0}")]
    UnknownRevision(u32),
    #[error("genre code {0} is not part of the taxonomy")]
    UnknownGenre(i64),
}
