//! Named normalization policies ("scenarios").
//!
//! A policy assigns one [`ScalingStrategy`] to each feature group. Policies
//! live in numbered tables so a consumer can pin the exact table a dataset was
//! produced with. Revision 1 is built in; further revisions come from config.

use serde::{Deserialize, Serialize};

use super::strategy::ScalingStrategy;
use super::strategy::ScalingStrategy::{
    IdentityMean as Mean, L2Normalize as L2, MinMax, StandardScore as Std,
};
use crate::error::{Error, Result};
use crate::features::FeatureGroup;

pub const BASELINE: &str = "baseline";
pub const CANONICAL_REVISION: u32 = 1;

/// Strategies in `mfcc, sf, sc, sr, tonnetz` order.
const REVISION_1: &[(&str, [ScalingStrategy; 5])] = &[
    (BASELINE, [Mean; 5]),
    ("scenario1", [Std, MinMax, MinMax, MinMax, Std]),
    ("scenario2", [Std; 5]),
    ("scenario3", [MinMax; 5]),
    ("scenario4", [MinMax, Std, Std, Std, MinMax]),
    ("scenario5", [L2, MinMax, MinMax, MinMax, L2]),
    ("scenario6", [L2, Std, Std, Std, L2]),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub mfcc: ScalingStrategy,
    pub sf: ScalingStrategy,
    pub sc: ScalingStrategy,
    pub sr: ScalingStrategy,
    pub tonnetz: ScalingStrategy,
}

impl Policy {
    fn from_tags(name: &str, [mfcc, sf, sc, sr, tonnetz]: [ScalingStrategy; 5]) -> Self {
        Self {
            name: name.to_string(),
            mfcc,
            sf,
            sc,
            sr,
            tonnetz,
        }
    }

    /// `identity_mean` for every group.
    pub fn baseline() -> Self {
        Self::from_tags(BASELINE, [Mean; 5])
    }

    pub fn strategy(&self, group: FeatureGroup) -> ScalingStrategy {
        match group {
            FeatureGroup::Mfcc => self.mfcc,
            FeatureGroup::SpectralFlatness => self.sf,
            FeatureGroup::SpectralCentroid => self.sc,
            FeatureGroup::SpectralRolloff => self.sr,
            FeatureGroup::Tonnetz => self.tonnetz,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    pub revision: u32,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

/// Outcome of looking up a policy identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub requested: String,
    pub policy: Policy,
    pub fell_back: bool,
}

impl PolicyTable {
    pub fn canonical() -> Self {
        Self {
            revision: CANONICAL_REVISION,
            policies: REVISION_1
                .iter()
                .map(|(name, tags)| Policy::from_tags(name, *tags))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|p| p.name.as_str())
    }

    /// Unknown identifiers resolve to [`Policy::baseline`] with `fell_back` set.
    pub fn resolve(&self, requested: &str) -> Resolution {
        match self.get(requested) {
            Some(policy) => Resolution {
                requested: requested.to_string(),
                policy: policy.clone(),
                fell_back: false,
            },
            None => Resolution {
                requested: requested.to_string(),
                policy: Policy::baseline(),
                fell_back: true,
            },
        }
    }
}

/// Every policy table known to a run, keyed by revision.
#[derive(Clone, Debug)]
pub struct PolicyCatalog {
    tables: Vec<PolicyTable>,
}

impl Default for PolicyCatalog {
    fn default() -> Self {
        Self {
            tables: vec![PolicyTable::canonical()],
        }
    }
}

impl PolicyCatalog {
    /// Built-in tables plus `extra`. Revision 1 cannot be redefined.
    pub fn with_tables(extra: Vec<PolicyTable>) -> Self {
        let mut catalog = Self::default();
        for table in extra {
            if table.revision == CANONICAL_REVISION {
                log::warn!(
                    "Ignoring configured policy table revision {}: it is built in",
                    CANONICAL_REVISION
                );
                continue;
            }
            match catalog.tables.iter_mut().find(|t| t.revision == table.revision) {
                Some(existing) => {
                    log::warn!(
                        "Policy table revision {} defined twice, keeping the last",
                        table.revision
                    );
                    *existing = table;
                }
                None => catalog.tables.push(table),
            }
        }
        catalog.tables.sort_by_key(|t| t.revision);
        catalog
    }

    pub fn table(&self, revision: u32) -> Result<&PolicyTable> {
        self.tables
            .iter()
            .find(|t| t.revision == revision)
            .ok_or(Error::UnknownRevision(revision))
    }

    pub fn revisions(&self) -> Vec<u32> {
        self.tables.iter().map(|t| t.revision).collect()
    }
}
