//! Scenario-driven reduction of a track's raw features.

pub mod policy;
pub mod strategy;

use serde::Serialize;

use crate::error::Result;
use crate::features::{FeatureGroup, NormalizedFeatureSet, RawFeatureSet};

pub use policy::{Policy, PolicyCatalog, PolicyTable, Resolution, BASELINE, CANONICAL_REVISION};
pub use strategy::{ScalingOptions, ScalingStrategy};

/// Recoverable conditions met while normalizing one track.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationWarning {
    UnknownPolicy {
        requested: String,
    },
    DegenerateDimension {
        group: FeatureGroup,
        dimension: usize,
        strategy: ScalingStrategy,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizationOutcome {
    pub features: NormalizedFeatureSet,
    pub requested_policy: String,
    /// Name of the policy actually applied; `baseline` after a fallback.
    pub resolved_policy: String,
    pub revision: u32,
    pub warnings: Vec<NormalizationWarning>,
}

impl NormalizationOutcome {
    pub fn fell_back(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, NormalizationWarning::UnknownPolicy { .. }))
    }
}

/// Normalizes tracks against one policy table with fixed options.
#[derive(Clone, Debug)]
pub struct Normalizer {
    table: PolicyTable,
    options: ScalingOptions,
}

impl Normalizer {
    pub fn new(table: PolicyTable, options: ScalingOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    pub fn options(&self) -> &ScalingOptions {
        &self.options
    }

    /// Reduce `raw` under the policy named `policy_id`. Unknown names are
    /// accepted: every group falls back to `identity_mean` and an
    /// [`NormalizationWarning::UnknownPolicy`] is recorded.
    pub fn normalize(&self, raw: RawFeatureSet, policy_id: &str) -> Result<NormalizationOutcome> {
        let resolution = self.table.resolve(policy_id);
        let mut warnings = Vec::new();
        if resolution.fell_back {
            log::warn!(
                "Unknown normalization policy '{}' (table revision {}), falling back to {}",
                policy_id,
                self.table.revision,
                BASELINE
            );
            warnings.push(NormalizationWarning::UnknownPolicy {
                requested: policy_id.to_string(),
            });
        }

        let mut reduced: [Vec<f64>; 5] = Default::default();
        for group in FeatureGroup::ALL {
            let strategy = resolution.policy.strategy(group);
            let matrix = raw.get(group);
            let scaled = strategy.apply(
                group,
                matrix.samples(),
                group.expected_dims(raw.n_mfcc()),
                &self.options,
            )?;
            for dimension in scaled.degenerate {
                log::debug!("{}: dimension {} is constant under {}", group, dimension, strategy);
                warnings.push(NormalizationWarning::DegenerateDimension {
                    group,
                    dimension,
                    strategy,
                });
            }
            reduced[group.index()] = scaled.values;
        }

        let [mfcc, sf, sc, sr, tonnetz] = reduced;
        Ok(NormalizationOutcome {
            features: NormalizedFeatureSet {
                mfcc,
                sf,
                sc,
                sr,
                tonnetz,
            },
            requested_policy: resolution.requested,
            resolved_policy: resolution.policy.name,
            revision: self.table.revision,
            warnings,
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(PolicyTable::canonical(), ScalingOptions::default())
    }
}

/// Normalize with the canonical table and default options.
pub fn normalize(raw: RawFeatureSet, policy_id: &str) -> Result<NormalizationOutcome> {
    Normalizer::default().normalize(raw, policy_id)
}
