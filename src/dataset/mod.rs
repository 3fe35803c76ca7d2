//! Turns a genre-labelled audio corpus into feature [`Example`]s.
//!
//! Expected layout is GTZAN's: `<root>/<genre>/<track>.<ext>`. Genre
//! directories outside the taxonomy are skipped.

pub mod download;
pub mod writer;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::audio::{self, ExtractionConfig};
use crate::features::{self, NormalizedFeatureSet, SummarizedFeatures};
use crate::genre::Genre;
use crate::normalize::{NormalizationWarning, Normalizer};

/// Which reduction path turns raw frames into a fixed-length row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reduction {
    Normalize { policy: String },
    Summarize,
}

impl Reduction {
    pub fn column_names(&self, n_mfcc: usize) -> Vec<String> {
        match self {
            Reduction::Normalize { .. } => NormalizedFeatureSet::column_names(n_mfcc),
            Reduction::Summarize => SummarizedFeatures::column_names(n_mfcc),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrackFeatures {
    Normalized(NormalizedFeatureSet),
    Summarized(SummarizedFeatures),
}

impl TrackFeatures {
    pub fn to_row(&self) -> Vec<f64> {
        match self {
            TrackFeatures::Normalized(f) => f.to_row(),
            TrackFeatures::Summarized(f) => f.to_row(),
        }
    }
}

/// One labelled track, ready to persist.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Example {
    pub features: TrackFeatures,
    pub label: Genre,
    pub source: String,
    pub track_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackFile {
    pub path: PathBuf,
    pub genre: Genre,
    pub track_id: String,
}

/// List every supported audio file under mapped genre directories, sorted.
pub fn discover_tracks(root: &Path) -> Result<Vec<TrackFile>> {
    let mut tracks = Vec::new();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read corpus directory: {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let Some(genre) = Genre::from_gtzan_genre(&dir_name) else {
            log::info!("Skipping genre directory '{}': not in the taxonomy", dir_name);
            continue;
        };
        for file in std::fs::read_dir(entry.path())? {
            let path = file?.path();
            if !path.is_file() || !audio::decode::is_supported(&path) {
                continue;
            }
            let track_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            tracks.push(TrackFile {
                path,
                genre,
                track_id,
            });
        }
    }
    tracks.sort_by(|a, b| (a.genre, &a.track_id).cmp(&(b.genre, &b.track_id)));
    Ok(tracks)
}

pub struct AssemblerOptions {
    pub extraction: ExtractionConfig,
    pub max_frames: usize,
    pub source: String,
    pub fail_fast: bool,
    pub show_progress: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            max_frames: features::DEFAULT_MAX_FRAMES,
            source: "GTZAN".into(),
            fail_fast: false,
            show_progress: false,
        }
    }
}

/// Everything a batch produced, in `(label, track_id)` order.
#[derive(Debug, Default)]
pub struct Batch {
    pub examples: Vec<Example>,
    pub skipped: Vec<(PathBuf, String)>,
    pub warnings: Vec<(String, NormalizationWarning)>,
}

pub struct Assembler {
    options: AssemblerOptions,
    normalizer: Normalizer,
    reduction: Reduction,
    /// Set when the requested policy is unknown; reported once per batch.
    fallback: Option<NormalizationWarning>,
}

impl Assembler {
    pub fn new(options: AssemblerOptions, normalizer: Normalizer, reduction: Reduction) -> Self {
        let mut fallback = None;
        let reduction = match reduction {
            Reduction::Normalize { policy } => {
                let resolution = normalizer.table().resolve(&policy);
                if resolution.fell_back {
                    log::warn!(
                        "Unknown normalization policy '{}', every track will use {}",
                        policy,
                        resolution.policy.name
                    );
                    fallback = Some(NormalizationWarning::UnknownPolicy { requested: policy });
                }
                Reduction::Normalize {
                    policy: resolution.policy.name,
                }
            }
            Reduction::Summarize => Reduction::Summarize,
        };
        Self {
            options,
            normalizer,
            reduction,
            fallback,
        }
    }

    /// The reduction actually applied, after policy resolution.
    pub fn reduction(&self) -> &Reduction {
        &self.reduction
    }

    pub fn fallback(&self) -> Option<&NormalizationWarning> {
        self.fallback.as_ref()
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Extract and reduce already-decoded mono samples.
    pub fn process_samples(
        &self,
        samples: &[f32],
        genre: Genre,
        track_id: &str,
    ) -> crate::Result<(Example, Vec<NormalizationWarning>)> {
        let raw =
            audio::extract_features(samples, &self.options.extraction, self.options.max_frames)?;
        let (features, warnings) = match &self.reduction {
            Reduction::Normalize { policy } => {
                let outcome = self.normalizer.normalize(raw, policy)?;
                (TrackFeatures::Normalized(outcome.features), outcome.warnings)
            }
            Reduction::Summarize => {
                (TrackFeatures::Summarized(features::summarize(raw)), Vec::new())
            }
        };
        let example = Example {
            features,
            label: genre,
            source: self.options.source.clone(),
            track_id: track_id.to_string(),
        };
        Ok((example, warnings))
    }

    pub fn process_track(&self, track: &TrackFile) -> Result<(Example, Vec<NormalizationWarning>)> {
        let audio = audio::load_audio(&track.path, self.options.extraction.sample_rate)?;
        if audio.samples.is_empty() {
            anyhow::bail!("{} decoded to zero samples", track.path.display());
        }
        log::debug!("{}: {:.1}s of audio", track.track_id, audio.duration());
        let processed = self
            .process_samples(&audio.samples, track.genre, &track.track_id)
            .with_context(|| format!("Failed to process {}", track.path.display()))?;
        Ok(processed)
    }

    /// Process every track in parallel. Failing tracks are skipped and
    /// recorded unless `fail_fast` is set, in which case the first failure
    /// aborts the batch.
    pub fn build(&self, tracks: &[TrackFile]) -> Result<Batch> {
        let pb = if self.options.show_progress {
            let pb = ProgressBar::new(tracks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tracks (eta {eta})",
                    )
                    .context("Invalid progress bar template")?
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let run = |track: &TrackFile| {
            let result = self.process_track(track);
            pb.inc(1);
            result
        };

        type Processed = Result<(Example, Vec<NormalizationWarning>)>;
        let results: Vec<(usize, Processed)> = if self.options.fail_fast {
            tracks
                .par_iter()
                .map(run)
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .map(Ok)
                .enumerate()
                .collect()
        } else {
            tracks.par_iter().map(run).collect::<Vec<_>>().into_iter().enumerate().collect()
        };
        pb.finish_and_clear();

        let mut batch = Batch::default();
        if let Some(warning) = &self.fallback {
            batch.warnings.push((String::new(), warning.clone()));
        }
        for (i, result) in results {
            match result {
                Ok((example, warnings)) => {
                    batch
                        .warnings
                        .extend(warnings.into_iter().map(|w| (example.track_id.clone(), w)));
                    batch.examples.push(example);
                }
                Err(err) => {
                    log::warn!("Skipping {}: {:#}", tracks[i].path.display(), err);
                    batch.skipped.push((tracks[i].path.clone(), format!("{:#}", err)));
                }
            }
        }
        batch
            .examples
            .sort_by(|a, b| (a.label, &a.track_id).cmp(&(b.label, &b.track_id)));

        log::info!(
            "Built {} examples ({} skipped, {} warnings)",
            batch.examples.len(),
            batch.skipped.len(),
            batch.warnings.len()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PolicyTable;

    fn tone(freq: f32) -> Vec<f32> {
        (0..22050)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin())
            .collect()
    }

    fn assembler(reduction: Reduction) -> Assembler {
        Assembler::new(AssemblerOptions::default(), Normalizer::default(), reduction)
    }

    #[test]
    fn unknown_policy_is_resolved_once() {
        let a = assembler(Reduction::Normalize {
            policy: "scenario99".into(),
        });
        assert_eq!(
            a.reduction(),
            &Reduction::Normalize {
                policy: "baseline".into()
            }
        );
        assert!(matches!(
            a.fallback(),
            Some(NormalizationWarning::UnknownPolicy { requested }) if requested == "scenario99"
        ));
    }

    #[test]
    fn process_samples_labels_example() {
        let a = assembler(Reduction::Normalize {
            policy: "scenario1".into(),
        });
        let (example, _) = a.process_samples(&tone(440.0), Genre::Rock, "rock.00001").unwrap();
        assert_eq!(example.label, Genre::Rock);
        assert_eq!(example.source, "GTZAN");
        assert_eq!(example.track_id, "rock.00001");
        assert_eq!(example.features.to_row().len(), 13 + 3 + 6);
    }

    #[test]
    fn summarize_reduction_produces_seven_statistics() {
        let a = assembler(Reduction::Summarize);
        let (example, warnings) = a.process_samples(&tone(220.0), Genre::Pop, "pop.1").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(example.features.to_row().len(), 7 * 22);
    }

    #[test]
    fn scenario_only_depends_on_the_track() {
        let a = Assembler::new(
            AssemblerOptions::default(),
            Normalizer::new(PolicyTable::canonical(), Default::default()),
            Reduction::Normalize {
                policy: "scenario5".into(),
            },
        );
        let (first, _) = a.process_samples(&tone(330.0), Genre::Pop, "a").unwrap();
        a.process_samples(&tone(1200.0), Genre::Pop, "b").unwrap();
        let (again, _) = a.process_samples(&tone(330.0), Genre::Pop, "a").unwrap();
        assert_eq!(first, again);
    }
}
