use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

const BASE_URL: &str = concat!(
    "https://raw.githubusercontent.com/ufrpe-2021-2-IA/music-dataset/",
    "feat/summary-statistics/gtzan/processed"
);

/// Published dataset variants.
pub const SCENARIOS: &[&str] = &["raw", "min_max", "standardized"];

const EXPERIMENTS: usize = 5;
const FOLDS: usize = 10;

fn check_scenario(scenario: &str) -> Result<()> {
    if !SCENARIOS.contains(&scenario) {
        anyhow::bail!(
            "Unrecognized scenario '{}'. Valid scenarios: {}",
            scenario,
            SCENARIOS.join(", ")
        );
    }
    Ok(())
}

pub fn dataset_url(scenario: &str) -> Result<String> {
    check_scenario(scenario)?;
    Ok(format!("{}/mgd_{}.csv", BASE_URL, scenario))
}

/// Relative paths of every file in a scenario's experiment set.
pub fn experiment_files() -> Vec<String> {
    let mut files = vec!["train.csv".to_string(), "test.csv".to_string()];
    for experiment in 1..=EXPERIMENTS {
        for fold in 1..=FOLDS {
            files.push(format!("experiment-{}/fold-{}.csv", experiment, fold));
        }
    }
    files
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request failed: {}", url))?;
    if !response.status().is_success() {
        anyhow::bail!("Couldn't download {} (HTTP {})", url, response.status());
    }
    response
        .text()
        .with_context(|| format!("Failed to read response body: {}", url))
}

fn save(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

/// Download `mgd_<scenario>.csv` into `target_dir`.
pub fn download_dataset(scenario: &str, target_dir: &Path) -> Result<PathBuf> {
    let url = dataset_url(scenario)?;
    let client = reqwest::blocking::Client::new();
    log::info!("Downloading {}", url);
    let body = fetch(&client, &url)?;
    let path = target_dir.join(format!("mgd_{}.csv", scenario));
    save(&path, &body)?;
    log::info!("Saved {}", path.display());
    Ok(path)
}

/// Download the train/test split and every experiment fold of a scenario
/// into `<target_dir>/<scenario>/`.
pub fn download_experiments(scenario: &str, target_dir: &Path) -> Result<Vec<PathBuf>> {
    check_scenario(scenario)?;
    let client = reqwest::blocking::Client::new();
    let save_dir = target_dir.join(scenario);
    let files = experiment_files();

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut saved = Vec::with_capacity(files.len());
    for file in &files {
        let url = format!("{}/{}/{}", BASE_URL, scenario, file);
        let body = fetch(&client, &url)?;
        let path = save_dir.join(file);
        save(&path, &body)?;
        saved.push(path);
        pb.inc(1);
    }
    pb.finish_and_clear();

    log::info!("Saved {} files under {}", saved.len(), save_dir.display());
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scenarios() {
        let err = dataset_url("scenario3").unwrap_err();
        assert!(err.to_string().contains("Unrecognized scenario 'scenario3'"));
        let dir = tempfile::tempdir().unwrap();
        assert!(download_experiments("normalized", dir.path()).is_err());
    }

    #[test]
    fn builds_dataset_urls() {
        assert!(dataset_url("min_max").unwrap().ends_with("/gtzan/processed/mgd_min_max.csv"));
    }

    #[test]
    fn experiment_set_has_every_fold() {
        let files = experiment_files();
        assert_eq!(files.len(), 2 + 5 * 10);
        assert_eq!(files[2], "experiment-1/fold-1.csv");
        assert_eq!(files.last().map(String::as_str), Some("experiment-5/fold-10.csv"));
    }
}
