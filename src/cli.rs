use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mgd", about = "Music genre dataset builder")]
pub struct Cli {
    /// Config file (default: ./mgd.toml, then ~/.config/mgd/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and reduce every track of a genre-labelled corpus into a CSV
    Build(BuildArgs),
    /// Print the reduced feature vector of a single audio file as JSON
    Inspect(InspectArgs),
    /// List the normalization policies of a table revision
    Policies {
        /// Policy table revision (default: config, then 1)
        #[arg(long)]
        revision: Option<u32>,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download a published processed dataset
    Download {
        /// Dataset variant: raw, min_max or standardized
        scenario: String,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Also download the train/test split and experiment folds
        #[arg(long)]
        experiments: bool,
    },
}

#[derive(Args, Debug)]
pub struct ReductionArgs {
    /// Normalization policy. Unknown names are accepted and fall back to
    /// baseline with a warning.
    #[arg(short, long, default_value = "baseline")]
    pub policy: String,

    /// Pin a policy table revision
    #[arg(long)]
    pub revision: Option<u32>,

    /// Reduce to summary statistics instead of a normalization policy
    #[arg(long)]
    pub summary: bool,

    /// Number of MFCC coefficients
    #[arg(long, default_value_t = 13)]
    pub n_mfcc: usize,

    /// Target range for min_max scaling, as LOWER,UPPER
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub range: Vec<f64>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Corpus root laid out as <root>/<genre>/<track>
    pub corpus: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "mgd.csv")]
    pub output: PathBuf,

    #[command(flatten)]
    pub reduction: ReductionArgs,

    /// Source dataset name recorded on every row
    #[arg(long)]
    pub source: Option<String>,

    /// Abort on the first track that fails instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    #[command(flatten)]
    pub reduction: ReductionArgs,
}
