//! Configuration.
//!
//! Stored as YAML in ~/.giztoy/facesort/config.yaml. Every field is
//! optional; missing fields take their defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FaceSortError;
use crate::analysis::{AnalysisConfig, DEFAULT_EXTENSIONS};
use crate::dbscan::DEFAULT_EPS;
use crate::filter::DEFAULT_SHARED_MARKER;
use crate::oracle::{ClusterParams, DEFAULT_DETECTIONS_FILE};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".giztoy";
/// Application directory under the base directory.
pub const APP_NAME: &str = "facesort";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// facesort configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum detector confidence for a face to be clustered.
    pub min_score: f32,

    /// Smallest group the cluster oracle may report.
    pub min_cluster_size: usize,

    /// Neighbours (self included) a face needs to seed a cluster.
    pub min_samples: usize,

    /// Neighbourhood radius, in cosine distance, for the built-in clusterer.
    pub eps: f32,

    /// Folders whose names contain this marker are never sorted.
    pub shared_marker: String,

    /// Image extensions, case-insensitive, without the dot.
    pub extensions: Vec<String>,

    /// Name of the per-folder detections file.
    pub detections_file: String,

    /// First global cluster id handed out in a run.
    pub start_id: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_score: 0.5,
            min_cluster_size: 2,
            min_samples: 1,
            eps: DEFAULT_EPS,
            shared_marker: DEFAULT_SHARED_MARKER.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            detections_file: DEFAULT_DETECTIONS_FILE.to_string(),
            start_id: 1,
        }
    }
}

impl Config {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| {
            home.join(DEFAULT_BASE_DIR)
                .join(APP_NAME)
                .join(DEFAULT_CONFIG_FILE)
        })
    }

    /// Parses YAML and validates the result.
    pub fn from_yaml(yaml: &str) -> Result<Self, FaceSortError> {
        let cfg: Config =
            serde_yaml::from_str(yaml).map_err(|e| FaceSortError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads `custom` if given, otherwise the default path.
    ///
    /// A missing default file yields defaults; a missing custom file is an error.
    pub fn load(custom: Option<&Path>) -> Result<Self, FaceSortError> {
        let path = match custom {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FaceSortError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content).map_err(|e| match e {
            FaceSortError::Config(msg) => {
                FaceSortError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<(), FaceSortError> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(FaceSortError::Config(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        if self.min_cluster_size == 0 || self.min_samples == 0 {
            return Err(FaceSortError::Config(
                "min_cluster_size and min_samples must be positive".into(),
            ));
        }
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(FaceSortError::Config(format!("invalid eps {}", self.eps)));
        }
        if self.start_id == 0 {
            return Err(FaceSortError::Config("start_id must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(FaceSortError::Config("extensions must not be empty".into()));
        }
        if self.detections_file.is_empty() {
            return Err(FaceSortError::Config("detections_file must not be empty".into()));
        }
        Ok(())
    }

    /// Analysis tunables derived from this config.
    pub fn analysis(&self) -> AnalysisConfig {
        let extensions: BTreeSet<String> = self
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        AnalysisConfig {
            min_score: self.min_score,
            cluster: ClusterParams {
                min_cluster_size: self.min_cluster_size,
                min_samples: self.min_samples,
            },
            extensions,
        }
    }
}
