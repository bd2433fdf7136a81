use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use giztoy_facesort::{
    AnalysisConfig, Analyzer, ClusterCursor, Config, Coordinator, Dbscan, DistributionResult,
    Distributor, ImageCrateDecoder, MarkerFilter, OsFs, Plan, SidecarOracleProvider,
    SubfolderOutcome, TracingProgress,
};
use serde::Serialize;

use crate::{Cli, Commands, Tuning};

/// Result of sorting one folder.
#[derive(Serialize)]
struct SortSummary {
    dir: PathBuf,
    clusters: usize,
    planned: usize,
    unreadable: Vec<PathBuf>,
    no_faces: Vec<PathBuf>,
    #[serde(flatten)]
    result: DistributionResult,
}

impl SortSummary {
    fn new(dir: &Path, plan: Plan, result: DistributionResult) -> Self {
        Self {
            dir: dir.to_path_buf(),
            clusters: plan.clusters.len(),
            planned: plan.items.len(),
            unreadable: plan.unreadable,
            no_faces: plan.no_faces,
            result,
        }
    }
}

/// Where and how results are printed.
struct Output {
    json: bool,
    file: Option<String>,
}

impl Output {
    /// Writes `value` as YAML, or JSON with `--json`, to the output file or stdout.
    fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let text = if self.json {
            serde_json::to_string_pretty(value)?
        } else {
            serde_yaml::to_string(value)?
        };
        match &self.file {
            Some(path) => File::create(path)
                .and_then(|mut f| f.write_all(text.as_bytes()))
                .with_context(|| format!("writing {}", path))?,
            None => println!("{}", text),
        }
        Ok(())
    }
}

/// Owns every pipeline component so analyzers can borrow them.
struct Pipeline {
    config: Config,
    analysis: AnalysisConfig,
    embeddings: SidecarOracleProvider,
    clusterer: Dbscan,
    filter: MarkerFilter,
}

impl Pipeline {
    fn new(config: Config) -> Self {
        Self {
            analysis: config.analysis(),
            embeddings: SidecarOracleProvider::new(config.detections_file.clone()),
            clusterer: Dbscan::new(config.eps),
            filter: MarkerFilter::new(&config.shared_marker),
            config,
        }
    }

    fn coordinator(&self) -> Coordinator<'_> {
        Coordinator::new(self.analyzer(), Distributor::new(&OsFs, &TracingProgress))
    }

    fn analyzer(&self) -> Analyzer<'_> {
        Analyzer {
            config: &self.analysis,
            decoder: &ImageCrateDecoder,
            embeddings: &self.embeddings,
            clusterer: &self.clusterer,
            filter: &self.filter,
            progress: &TracingProgress,
        }
    }

    fn cursor(&self, start: Option<u32>) -> anyhow::Result<ClusterCursor> {
        let start = start.unwrap_or(self.config.start_id);
        anyhow::ensure!(start >= 1, "--start must be at least 1");
        Ok(ClusterCursor::new(start))
    }
}

/// Loads the config file and applies command line overrides.
fn load_config(path: Option<&Path>, tuning: &Tuning) -> anyhow::Result<Config> {
    let mut cfg = Config::load(path)?;
    if let Some(v) = tuning.min_score {
        cfg.min_score = v;
    }
    if let Some(v) = tuning.min_cluster_size {
        cfg.min_cluster_size = v;
    }
    if let Some(v) = tuning.min_samples {
        cfg.min_samples = v;
    }
    if let Some(v) = tuning.eps {
        cfg.eps = v;
    }
    if let Some(v) = &tuning.marker {
        cfg.shared_marker = v.clone();
    }
    if let Some(v) = &tuning.detections {
        cfg.detections_file = v.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), &cli.tuning)?;
    let pipeline = Pipeline::new(config);
    let output = Output {
        json: cli.json,
        file: cli.output.clone(),
    };

    match &cli.command {
        Commands::Plan { dir } => {
            let plan = pipeline
                .analyzer()
                .analyze(dir)
                .with_context(|| format!("analysing {}", dir.display()))?;
            output.write(&plan)
        }
        Commands::Sort { dir, start } => {
            let cursor = pipeline.cursor(*start)?;
            let (plan, result) = pipeline
                .coordinator()
                .sort_folder(dir, cursor)
                .with_context(|| format!("sorting {}", dir.display()))?;
            output.write(&SortSummary::new(dir, plan, result))
        }
        Commands::Apply {
            plan,
            base_dir,
            start,
        } => {
            let cursor = pipeline.cursor(*start)?;
            let loaded = Plan::load(plan)?;
            anyhow::ensure!(base_dir.is_dir(), "{} is not a directory", base_dir.display());
            let result =
                Distributor::new(&OsFs, &TracingProgress).distribute(&loaded, base_dir, cursor)?;
            output.write(&SortSummary::new(base_dir, loaded, result))
        }
        Commands::Group { dir, start } => {
            let cursor = pipeline.cursor(*start)?;
            let report = pipeline.coordinator().run(dir, cursor)?;
            for sub in &report.subfolders {
                match &sub.outcome {
                    SubfolderOutcome::Completed {
                        clusters,
                        planned,
                        moved,
                        copied,
                        unreadable,
                        no_faces,
                        ..
                    } => tracing::info!(
                        "{}: clusters {}, images {}, moved {}, copied {}, unreadable {}, no faces {}",
                        sub.name,
                        clusters,
                        planned,
                        moved,
                        copied,
                        unreadable.len(),
                        no_faces.len()
                    ),
                    SubfolderOutcome::Failed { error } => {
                        tracing::error!("{}: failed: {}", sub.name, error)
                    }
                }
            }
            output.write(&report)
        }
    }
}
