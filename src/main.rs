mod cli;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{BuildArgs, Cli, Command, InspectArgs, ReductionArgs};
use mgd::audio::spectrum::StftConfig;
use mgd::audio::{self, ExtractionConfig};
use mgd::config::{self, Config};
use mgd::dataset::writer::{self, Manifest};
use mgd::dataset::{self, download, Assembler, AssemblerOptions, Reduction, TrackFeatures};
use mgd::normalize::{Normalizer, PolicyCatalog, ScalingOptions};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::discover(cli.config.clone()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Command::Build(args) => build(args, &config),
        Command::Inspect(args) => inspect(args, &config),
        Command::Policies { revision, json } => list_policies(revision, json, &config),
        Command::Download {
            scenario,
            dir,
            experiments,
        } => {
            let path = download::download_dataset(&scenario, &dir)?;
            println!("{}", path.display());
            if experiments {
                let files = download::download_experiments(&scenario, &dir)?;
                println!(
                    "{} experiment files under {}",
                    files.len(),
                    dir.join(&scenario).display()
                );
            }
            Ok(())
        }
    }
}

/// CLI arguments merged over the config file.
struct Settings {
    extraction: ExtractionConfig,
    normalizer: Normalizer,
    reduction: Reduction,
    max_frames: usize,
}

fn resolve_settings(args: &ReductionArgs, cfg: &Config) -> Result<Settings> {
    // Config values apply only when the CLI is at its default
    let policy = if args.policy == config::default_policy() {
        cfg.normalization.policy.clone()
    } else {
        args.policy.clone()
    };
    let n_mfcc = if args.n_mfcc == config::default_n_mfcc() {
        cfg.audio.n_mfcc
    } else {
        args.n_mfcc
    };
    let revision = args.revision.unwrap_or(cfg.normalization.revision);
    let range = match args.range.as_slice() {
        [] => (cfg.normalization.min_max_range[0], cfg.normalization.min_max_range[1]),
        [lower, upper] => (*lower, *upper),
        other => anyhow::bail!("--range takes LOWER,UPPER, got {} values", other.len()),
    };

    if cfg.audio.n_fft < 2 || cfg.audio.n_fft % 2 != 0 || cfg.audio.hop_length == 0 {
        anyhow::bail!(
            "Invalid STFT settings: n_fft {} must be even, hop_length {} must be positive",
            cfg.audio.n_fft,
            cfg.audio.hop_length
        );
    }

    let catalog = PolicyCatalog::with_tables(cfg.policy_tables.clone());
    let table = catalog.table(revision)?.clone();
    let options = ScalingOptions::new(range)?;

    let reduction = if args.summary {
        Reduction::Summarize
    } else {
        Reduction::Normalize { policy }
    };

    Ok(Settings {
        extraction: ExtractionConfig {
            sample_rate: cfg.audio.sample_rate,
            n_mfcc,
            stft: StftConfig {
                n_fft: cfg.audio.n_fft,
                hop_length: cfg.audio.hop_length,
            },
            ..ExtractionConfig::default()
        },
        normalizer: Normalizer::new(table, options),
        reduction,
        max_frames: cfg.normalization.max_frames,
    })
}

fn build(args: BuildArgs, cfg: &Config) -> Result<()> {
    let settings = resolve_settings(&args.reduction, cfg)?;
    let requested_policy = match &settings.reduction {
        Reduction::Normalize { policy } => Some(policy.clone()),
        Reduction::Summarize => None,
    };
    let revision = settings.normalizer.table().revision;
    let range = settings.normalizer.options().min_max_range();

    let assembler = Assembler::new(
        AssemblerOptions {
            extraction: settings.extraction,
            max_frames: settings.max_frames,
            source: args.source.unwrap_or_else(|| cfg.dataset.source.clone()),
            fail_fast: args.fail_fast || cfg.dataset.fail_fast,
            show_progress: true,
        },
        settings.normalizer,
        settings.reduction,
    );

    log::info!("mgd - music genre dataset builder");
    log::info!("Corpus: {}", args.corpus.display());
    log::info!("Output: {}", args.output.display());
    match assembler.reduction() {
        Reduction::Normalize { policy } => {
            log::info!("Policy: {} (table revision {})", policy, revision)
        }
        Reduction::Summarize => log::info!("Reduction: summary statistics"),
    }

    let tracks = dataset::discover_tracks(&args.corpus)?;
    if tracks.is_empty() {
        anyhow::bail!("No audio files found under {}", args.corpus.display());
    }
    log::info!("Found {} tracks", tracks.len());

    let batch = assembler.build(&tracks)?;
    let n_mfcc = assembler.options().extraction.n_mfcc;
    let columns = assembler.reduction().column_names(n_mfcc);
    writer::write_csv(&args.output, &batch.examples, &columns)?;

    let resolved_policy = match assembler.reduction() {
        Reduction::Normalize { policy } => Some(policy.clone()),
        Reduction::Summarize => None,
    };
    let manifest = Manifest {
        mode: Manifest::mode_name(assembler.reduction()),
        table_revision: requested_policy.as_ref().map(|_| revision),
        requested_policy,
        resolved_policy,
        n_mfcc,
        sample_rate: assembler.options().extraction.sample_rate,
        min_max_range: range,
        tracks_written: batch.examples.len(),
        tracks_skipped: batch.skipped.len(),
        skipped: Manifest::collect_skipped(&batch),
        warnings: Manifest::collect_warnings(&batch),
    };
    let manifest_path = writer::write_manifest(&args.output, &manifest)?;
    log::info!("Done! Manifest: {}", manifest_path.display());
    Ok(())
}

fn inspect(args: InspectArgs, cfg: &Config) -> Result<()> {
    let settings = resolve_settings(&args.reduction, cfg)?;
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let audio = audio::load_audio(&args.input, settings.extraction.sample_rate)?;
    let raw = audio::extract_features(&audio.samples, &settings.extraction, settings.max_frames)
        .with_context(|| format!("Failed to extract features from {}", args.input.display()))?;
    let frames = raw.frames();

    let report = match &settings.reduction {
        Reduction::Normalize { policy } => {
            let outcome = settings.normalizer.normalize(raw, policy)?;
            serde_json::json!({
                "input": args.input,
                "frames": frames,
                "requested_policy": outcome.requested_policy,
                "resolved_policy": outcome.resolved_policy,
                "table_revision": outcome.revision,
                "features": TrackFeatures::Normalized(outcome.features),
                "warnings": outcome.warnings,
            })
        }
        Reduction::Summarize => serde_json::json!({
            "input": args.input,
            "frames": frames,
            "features": TrackFeatures::Summarized(mgd::features::summarize(raw)),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn list_policies(revision: Option<u32>, json: bool, cfg: &Config) -> Result<()> {
    let catalog = PolicyCatalog::with_tables(cfg.policy_tables.clone());
    let revision = revision.unwrap_or(cfg.normalization.revision);
    let table = catalog.table(revision)?;
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    println!("Policy table revision {} (available: {:?}):", table.revision, catalog.revisions());
    println!(
        "  {:<12} {:<16} {:<16} {:<16} {:<16} {:<16}",
        "policy", "mfcc", "sf", "sc", "sr", "tonnetz"
    );
    for p in &table.policies {
        println!(
            "  {:<12} {:<16} {:<16} {:<16} {:<16} {:<16}",
            p.name,
            p.mfcc.name(),
            p.sf.name(),
            p.sc.name(),
            p.sr.name(),
            p.tonnetz.name()
        );
    }
    println!("Unknown policy names fall back to baseline with a warning.");
    Ok(())
}
