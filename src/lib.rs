//! Build labelled, fixed-length genre feature datasets from audio.
//!
//! Per-frame descriptors (MFCC, spectral flatness, centroid, rolloff and
//! tonnetz) are reduced per track either under a named normalization policy
//! ([`normalize`]) or to summary statistics ([`features::summarize`]).

pub mod audio;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod genre;
pub mod normalize;

pub use error::{Error, Result};
pub use features::{FeatureGroup, FeatureMatrix, NormalizedFeatureSet, RawFeatureSet, ShapeSpec};
pub use genre::Genre;
pub use normalize::{
    normalize, NormalizationOutcome, NormalizationWarning, Normalizer, ScalingStrategy,
};
