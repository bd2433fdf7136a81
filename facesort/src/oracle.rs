//! Interfaces to the face model and the clustering algorithm.
//!
//! Both are treated as opaque oracles. Production wiring uses
//! [`SidecarOracleProvider`] and [`crate::Dbscan`]; tests inject
//! deterministic stand-ins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decode::FaceImage;
use crate::distance::DistanceMatrix;
use crate::FaceSortError;

/// Label the cluster oracle uses for points it could not assign.
pub const NOISE_LABEL: i32 = -1;

/// Converts an oracle label into `Some(label)`, or `None` for noise.
pub fn raw_label(label: i32) -> Option<i32> {
    if label == NOISE_LABEL { None } else { Some(label) }
}

/// One detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector confidence.
    pub score: f32,
    /// Feature vector; normalized before clustering.
    pub embedding: Vec<f32>,
}

/// Detects faces and extracts their embeddings.
pub trait EmbeddingOracle {
    /// Returns detections in detector order. An image with no faces yields
    /// an empty vector.
    fn detect(&self, image: &FaceImage) -> Vec<Detection>;
}

/// Creates an [`EmbeddingOracle`] for one folder.
///
/// Failing to open is fatal for that folder only.
pub trait EmbeddingOracleProvider {
    fn open(&self, dir: &Path) -> Result<Box<dyn EmbeddingOracle>, FaceSortError>;
}

/// Tunables passed through to the cluster oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub min_cluster_size: usize,
    pub min_samples: usize,
}

/// Assigns a label to every row of a precomputed distance matrix.
///
/// Labels carry no meaning beyond equality and need not be contiguous.
/// [`NOISE_LABEL`] marks unclustered rows.
pub trait ClusterOracle {
    fn cluster(
        &self,
        distances: &DistanceMatrix,
        params: ClusterParams,
    ) -> Result<Vec<i32>, FaceSortError>;
}

/// Default detections file name inside each folder.
pub const DEFAULT_DETECTIONS_FILE: &str = "faces.json";

/// Opens detections precomputed by an external face model.
///
/// Each folder carries a JSON file mapping image paths, relative to the
/// folder and `/`-separated, to their detections:
///
/// ```json
/// { "kids/a.jpg": [ { "score": 0.93, "embedding": [0.1, 0.2] } ] }
/// ```
#[derive(Debug, Clone)]
pub struct SidecarOracleProvider {
    file_name: String,
}

impl SidecarOracleProvider {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for SidecarOracleProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DETECTIONS_FILE)
    }
}

impl EmbeddingOracleProvider for SidecarOracleProvider {
    fn open(&self, dir: &Path) -> Result<Box<dyn EmbeddingOracle>, FaceSortError> {
        let path = dir.join(&self.file_name);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FaceSortError::OracleInit(format!("{}: {}", path.display(), e)))?;
        let index = DetectionIndex::from_json(dir, &content)
            .map_err(|e| FaceSortError::OracleInit(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(index))
    }
}

/// In-memory detections keyed by path relative to a root folder.
#[derive(Debug, Clone, Default)]
pub struct DetectionIndex {
    root: PathBuf,
    faces: HashMap<String, Vec<Detection>>,
}

impl DetectionIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            faces: HashMap::new(),
        }
    }

    /// Parses the sidecar JSON format.
    pub fn from_json(root: impl Into<PathBuf>, json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Vec<Detection>> = serde_json::from_str(json)?;
        let faces = raw
            .into_iter()
            .map(|(k, v)| (k.replace('\\', "/"), v))
            .collect();
        Ok(Self {
            root: root.into(),
            faces,
        })
    }

    /// Adds detections for `rel_path`.
    pub fn insert(&mut self, rel_path: &str, detections: Vec<Detection>) {
        self.faces.insert(rel_path.replace('\\', "/"), detections);
    }

    fn key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl EmbeddingOracle for DetectionIndex {
    fn detect(&self, image: &FaceImage) -> Vec<Detection> {
        self.key(&image.path)
            .and_then(|k| self.faces.get(&k))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn face_image(path: &Path) -> FaceImage {
        FaceImage {
            path: path.to_path_buf(),
            pixels: DynamicImage::new_rgb8(1, 1),
        }
    }

    #[test]
    fn raw_label_maps_noise_to_none() {
        assert_eq!(raw_label(NOISE_LABEL), None);
        assert_eq!(raw_label(0), Some(0));
        assert_eq!(raw_label(7), Some(7));
    }

    #[test]
    fn index_looks_up_relative_paths() {
        let json = r#"{
            "a.jpg": [{"score": 0.9, "embedding": [1.0, 0.0]}],
            "sub\\b.jpg": [{"score": 0.4, "embedding": [0.0, 1.0]}]
        }"#;
        let index = DetectionIndex::from_json("/root/p", json).unwrap();

        let a = index.detect(&face_image(Path::new("/root/p/a.jpg")));
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].score, 0.9);

        let b = index.detect(&face_image(Path::new("/root/p/sub/b.jpg")));
        assert_eq!(b.len(), 1);

        assert!(index.detect(&face_image(Path::new("/root/p/c.jpg"))).is_empty());
        assert!(index.detect(&face_image(Path::new("/other/a.jpg"))).is_empty());
    }

    #[test]
    fn sidecar_provider_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SidecarOracleProvider::default().open(dir.path()).err().unwrap();
        assert!(matches!(err, FaceSortError::OracleInit(_)));
    }

    #[test]
    fn sidecar_provider_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("faces.json"), "{ not json").unwrap();
        let err = SidecarOracleProvider::default().open(dir.path()).err().unwrap();
        assert!(matches!(err, FaceSortError::OracleInit(_)));
    }

    #[test]
    fn sidecar_provider_opens_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dets.json"),
            r#"{"x.png": [{"score": 1.0, "embedding": [0.5, 0.5]}]}"#,
        )
        .unwrap();
        let oracle = SidecarOracleProvider::new("dets.json").open(dir.path()).unwrap();
        let dets = oracle.detect(&face_image(&dir.path().join("x.png")));
        assert_eq!(dets.len(), 1);
    }
}
