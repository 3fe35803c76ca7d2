use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{Batch, Example, Reduction};
use crate::normalize::NormalizationWarning;

const LEADING_COLUMNS: [&str; 3] = ["label", "src", "track_id"];

/// Run parameters stored next to every dataset so rows can be reproduced.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub mode: &'static str,
    pub requested_policy: Option<String>,
    pub resolved_policy: Option<String>,
    pub table_revision: Option<u32>,
    pub n_mfcc: usize,
    pub sample_rate: u32,
    pub min_max_range: (f64, f64),
    pub tracks_written: usize,
    pub tracks_skipped: usize,
    pub skipped: Vec<SkippedTrack>,
    pub warnings: Vec<TrackWarning>,
}

#[derive(Debug, Serialize)]
pub struct SkippedTrack {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TrackWarning {
    pub track_id: String,
    #[serde(flatten)]
    pub warning: NormalizationWarning,
}

impl Manifest {
    pub fn mode_name(reduction: &Reduction) -> &'static str {
        match reduction {
            Reduction::Normalize { .. } => "normalize",
            Reduction::Summarize => "summarize",
        }
    }

    pub fn collect_skipped(batch: &Batch) -> Vec<SkippedTrack> {
        batch
            .skipped
            .iter()
            .map(|(path, reason)| SkippedTrack {
                path: path.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    pub fn collect_warnings(batch: &Batch) -> Vec<TrackWarning> {
        batch
            .warnings
            .iter()
            .map(|(track_id, warning)| TrackWarning {
                track_id: track_id.clone(),
                warning: warning.clone(),
            })
            .collect()
    }
}

pub fn manifest_path(csv_path: &Path) -> PathBuf {
    let mut name = csv_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "dataset.csv".into());
    name.push(".manifest.json");
    csv_path.with_file_name(name)
}

pub fn write_csv(path: &Path, examples: &[Example], columns: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create dataset file: {}", path.display()))?;

    let header: Vec<&str> = LEADING_COLUMNS
        .iter()
        .copied()
        .chain(columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for example in examples {
        let row = example.features.to_row();
        if row.len() != columns.len() {
            anyhow::bail!(
                "{}: {} feature values for {} columns",
                example.track_id,
                row.len(),
                columns.len()
            );
        }
        let mut record = vec![
            example.label.code().to_string(),
            example.source.clone(),
            example.track_id.clone(),
        ];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    log::info!("Wrote {} rows to {}", examples.len(), path.display());
    Ok(())
}

pub fn write_manifest(csv_path: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let path = manifest_path(csv_path);
    let data = serde_json::to_vec_pretty(manifest).context("Failed to serialize manifest")?;
    std::fs::write(&path, data)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    Ok(path)
}

/// Load a processed dataset as `(features, labels)`. Every column except
/// `label`, `src`, `track_id` and `audio` is read as a feature.
pub fn load_processed(path: &Path) -> Result<(Array2<f64>, Vec<i64>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let label_idx = headers
        .iter()
        .position(|h| h == "label")
        .with_context(|| format!("{} has no 'label' column", path.display()))?;
    let feature_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !matches!(*h, "label" | "src" | "track_id" | "audio"))
        .map(|(i, _)| i)
        .collect();

    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default().trim();
        labels.push(
            field(label_idx)
                .parse::<f64>()
                .map(|l| l as i64)
                .with_context(|| format!("row {}: invalid label", line + 1))?,
        );
        for &i in &feature_idx {
            let value: f64 = field(i)
                .parse()
                .with_context(|| {
                    format!("row {}: column '{}' is not numeric", line + 1, &headers[i])
                })?;
            values.push(value);
        }
    }

    let features = Array2::from_shape_vec((labels.len(), feature_idx.len()), values)
        .context("Dataset rows have inconsistent widths")?;
    Ok((features, labels))
}
