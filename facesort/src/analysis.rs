//! Folder analysis: image discovery, face embedding and clustering.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::FaceSortError;
use crate::decode::ImageDecoder;
use crate::distance::{cosine_distances, l2_normalize};
use crate::filter::{has_excluded_ancestor, has_excluded_component, NameFilter};
use crate::oracle::{raw_label, ClusterOracle, ClusterParams, EmbeddingOracleProvider};
use crate::plan::{build_plan, Plan, PlanInput};
use crate::progress::{scaled_percent, Progress};

/// Image extensions picked up when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Tunables for [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Detections scoring below this are ignored.
    pub min_score: f32,
    pub cluster: ClusterParams,
    /// Lowercase extensions without the leading dot.
    pub extensions: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            cluster: ClusterParams {
                min_cluster_size: 2,
                min_samples: 1,
            },
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Recursively lists images under `root`, sorted by file name within each
/// directory. Images with any ancestor directory rejected by `filter`,
/// `root` and its parents included, are skipped.
pub fn discover_images(
    root: &Path,
    extensions: &BTreeSet<String>,
    filter: &dyn NameFilter,
) -> Result<Vec<PathBuf>, FaceSortError> {
    if let Ok(resolved) = root.canonicalize() {
        if has_excluded_component(filter, &resolved) {
            tracing::info!("{} is a shared folder, nothing to scan", resolved.display());
            return Ok(Vec::new());
        }
    }

    let mut images = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !filter.excludes(&e.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(FaceSortError::Scan(format!("{}: {}", root.display(), e)));
            }
            Err(e) => {
                tracing::warn!("scan: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_image = path
            .extension()
            .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false);
        if is_image && !has_excluded_ancestor(filter, path) {
            images.push(path.to_path_buf());
        }
    }
    Ok(images)
}

/// Runs the analysis phase for one folder and produces its [`Plan`].
pub struct Analyzer<'a> {
    pub config: &'a AnalysisConfig,
    pub decoder: &'a dyn ImageDecoder,
    pub embeddings: &'a dyn EmbeddingOracleProvider,
    pub clusterer: &'a dyn ClusterOracle,
    pub filter: &'a dyn NameFilter,
    pub progress: &'a dyn Progress,
}

impl Analyzer<'_> {
    /// Analyses every image under `dir`.
    ///
    /// Decode failures and faceless images end up in the plan diagnostics.
    /// Oracle, distance matrix and clustering failures abort the folder.
    pub fn analyze(&self, dir: &Path) -> Result<Plan, FaceSortError> {
        let all_images = discover_images(dir, &self.config.extensions, self.filter)?;
        tracing::info!("scanning {}: {} images", dir.display(), all_images.len());

        self.progress.notify("initializing embedding model", 5);
        let oracle = self.embeddings.open(dir)?;
        self.progress.notify("model ready, analysing images", 10);

        let mut embeddings: Vec<Vec<f32>> = Vec::new();
        let mut owners: Vec<PathBuf> = Vec::new();
        let mut face_counts: HashMap<PathBuf, usize> = HashMap::new();
        let mut unreadable = Vec::new();
        let mut no_faces = Vec::new();

        let total = all_images.len();
        for (i, path) in all_images.iter().enumerate() {
            let percent = scaled_percent(10, 70, i + 1, total);
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            self.progress.notify(
                &format!("analysing images: {}% ({}/{}) - {}", percent, i + 1, total, name),
                percent,
            );

            let image = match self.decoder.decode(path) {
                Ok(img) => img,
                Err(reason) => {
                    tracing::debug!("unreadable {}: {}", path.display(), reason);
                    unreadable.push(path.clone());
                    continue;
                }
            };

            let detections = oracle.detect(&image);
            if detections.is_empty() {
                no_faces.push(path.clone());
                continue;
            }

            let mut count = 0;
            for det in detections {
                if det.score < self.config.min_score {
                    continue;
                }
                let mut emb = det.embedding;
                if !l2_normalize(&mut emb) {
                    tracing::debug!("zero-norm embedding in {}", path.display());
                    continue;
                }
                embeddings.push(emb);
                owners.push(path.clone());
                count += 1;
            }
            if count > 0 {
                face_counts.insert(path.clone(), count);
            }
        }

        if embeddings.is_empty() {
            self.progress.notify("no faces to cluster", 100);
            tracing::info!("{}: no embeddings", dir.display());
            return Ok(Plan::empty(unreadable, no_faces));
        }

        self.progress
            .notify(&format!("clustering {} faces", embeddings.len()), 80);
        let distances = cosine_distances(&embeddings)?;
        self.progress.notify("distance matrix ready", 85);

        let labels = self.clusterer.cluster(&distances, self.config.cluster)?;
        if labels.len() != embeddings.len() {
            return Err(FaceSortError::LabelCount {
                expected: embeddings.len(),
                got: labels.len(),
            });
        }
        self.progress.notify("forming clusters", 90);

        let labels: Vec<Option<i32>> = labels.into_iter().map(raw_label).collect();
        self.progress.notify("building distribution plan", 95);
        let plan = build_plan(
            PlanInput {
                labels: &labels,
                owners: &owners,
                face_counts: &face_counts,
                all_images: &all_images,
            },
            unreadable,
            no_faces,
        );

        self.progress.notify(
            &format!(
                "clustering done: {} clusters, {} images",
                plan.clusters.len(),
                plan.items.len()
            ),
            100,
        );
        tracing::info!(
            "{}: {} clusters, {} images planned",
            dir.display(),
            plan.clusters.len(),
            plan.items.len()
        );
        Ok(plan)
    }
}
