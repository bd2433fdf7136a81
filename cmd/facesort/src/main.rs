//! facesort - sort photo folders into per-person subfolders.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// facesort - sort photo folders into per-person subfolders.
///
/// Faces are read from a per-folder detections file (faces.json by default)
/// written by an external face model, clustered by similarity, and each
/// photo is moved into a numbered folder per person. Photos showing several
/// people are copied into every matching folder.
///
/// Configuration is read from ~/.giztoy/facesort/config.yaml when present.
#[derive(Parser)]
#[command(name = "facesort")]
#[command(about = "Sort photos into per-person folders by face similarity")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.giztoy/facesort/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub tuning: Tuning,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for config file values.
#[derive(Args, Debug, Default)]
pub struct Tuning {
    /// Minimum face detection score
    #[arg(long, global = true)]
    pub min_score: Option<f32>,

    /// Minimum faces per cluster
    #[arg(long, global = true)]
    pub min_cluster_size: Option<usize>,

    /// Minimum neighbours for a face to seed a cluster
    #[arg(long, global = true)]
    pub min_samples: Option<usize>,

    /// Cluster radius in cosine distance
    #[arg(long, global = true)]
    pub eps: Option<f32>,

    /// Folder name marker for shared folders that are never sorted
    #[arg(long, global = true)]
    pub marker: Option<String>,

    /// Detections file name inside each folder
    #[arg(long, global = true)]
    pub detections: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse a folder and print its distribution plan
    Plan {
        /// Folder to analyse
        dir: PathBuf,
    },
    /// Analyse a folder and sort it into numbered folders
    Sort {
        /// Folder to sort
        dir: PathBuf,
        /// First cluster folder number
        #[arg(long)]
        start: Option<u32>,
    },
    /// Apply a stored plan (JSON or YAML)
    Apply {
        /// Plan file
        plan: PathBuf,
        /// Folder to create cluster folders in
        base_dir: PathBuf,
        /// First cluster folder number
        #[arg(long)]
        start: Option<u32>,
    },
    /// Sort every subfolder of a group folder with non-colliding numbers
    Group {
        /// Group folder
        dir: PathBuf,
        /// First cluster folder number
        #[arg(long)]
        start: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    commands::run(&cli)
}
