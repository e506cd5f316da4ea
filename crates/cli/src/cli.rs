use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Fill missing values in a delimited data file by k-means clustering.
///
/// Each record is assigned to a cluster using only the features that are
/// complete across the whole file; a missing cell then takes the mean of
/// that feature among its cluster-mates.
#[derive(Parser, Debug)]
#[command(name = "cfmv", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file whose keys override the environment configuration
    #[arg(long, global = true, env = "CFMV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the summary as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Impute the missing cells of a file and write the completed file
    Impute(ImputeArgs),
    /// Score an imputed file against the complete original
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct ImputeArgs {
    /// File with blank cells to fill
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the completed file
    #[arg(long)]
    pub output: PathBuf,

    /// Number of clusters
    #[arg(short, long)]
    pub k: usize,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Complete ground-truth file
    #[arg(long)]
    pub original: PathBuf,

    /// The same file with blanks, as fed to `impute`
    #[arg(long)]
    pub incomplete: PathBuf,

    /// Imputed result
    #[arg(long)]
    pub output: PathBuf,
}
