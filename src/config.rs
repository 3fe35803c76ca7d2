use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::normalize::PolicyTable;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub normalization: NormalizationConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub policy_tables: Vec<PolicyTable>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_n_mfcc")]
    pub n_mfcc: usize,
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
}

/// `policy` is not validated here: an unknown name is accepted and falls back
/// to `baseline` with a warning when tracks are normalized.
#[derive(Debug, Deserialize)]
pub struct NormalizationConfig {
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_revision")]
    pub revision: u32,
    #[serde(default = "default_min_max_range")]
    pub min_max_range: [f64; 2],
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            n_mfcc: default_n_mfcc(),
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            revision: default_revision(),
            min_max_range: default_min_max_range(),
            max_frames: default_max_frames(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            fail_fast: false,
        }
    }
}

pub fn default_sample_rate() -> u32 { 22050 }
pub fn default_n_mfcc() -> usize { 13 }
fn default_n_fft() -> usize { 2048 }
fn default_hop_length() -> usize { 512 }
pub fn default_policy() -> String { "baseline".into() }
pub fn default_revision() -> u32 { 1 }
fn default_min_max_range() -> [f64; 2] { [-1.0, 1.0] }
fn default_max_frames() -> usize { 200_000 }
fn default_source() -> String { "GTZAN".into() }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `mgd.toml` in the working directory, else the user
/// config directories.
pub fn discover(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("mgd.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("mgd").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("mgd").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.audio.sample_rate, 22050);
        assert_eq!(cfg.audio.n_mfcc, 13);
        assert_eq!(cfg.normalization.policy, "baseline");
        assert_eq!(cfg.normalization.min_max_range, [-1.0, 1.0]);
        assert_eq!(cfg.dataset.source, "GTZAN");
        assert!(cfg.policy_tables.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [audio]
            n_mfcc = 20

            [normalization]
            policy = "scenario42"
            revision = 2
            min_max_range = [0.0, 1.0]

            [dataset]
            fail_fast = true

            [[policy_tables]]
            revision = 2

            [[policy_tables.policies]]
            name = "scenario42"
            mfcc = "min_max"
            sf = "min_max"
            sc = "min_max"
            sr = "min_max"
            tonnetz = "standard_score"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.audio.n_mfcc, 20);
        assert_eq!(cfg.audio.hop_length, 512);
        assert_eq!(cfg.normalization.policy, "scenario42");
        assert_eq!(cfg.normalization.min_max_range, [0.0, 1.0]);
        assert!(cfg.dataset.fail_fast);
        assert_eq!(cfg.policy_tables[0].policies[0].name, "scenario42");
    }
}
