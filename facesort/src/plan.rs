//! Distribution plans.
//!
//! A [`Plan`] is the complete, read-only description of which images go
//! to which cluster folder, computed before anything on disk is touched.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FaceSortError;

/// One image's participation in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub path: PathBuf,
    /// Local cluster ids, ascending, never empty.
    #[serde(rename = "cluster")]
    pub clusters: Vec<u32>,
    /// Faces accepted for clustering in this image.
    #[serde(rename = "faces")]
    pub face_count: usize,
}

/// Cluster assignments for one analysed folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Local cluster id (1..=K) to member paths, sorted by path.
    #[serde(default)]
    pub clusters: BTreeMap<u32, Vec<PathBuf>>,
    /// Images with at least one clustered face, in discovery order.
    #[serde(default, rename = "plan")]
    pub items: Vec<PlanItem>,
    /// Images that could not be decoded.
    #[serde(default)]
    pub unreadable: Vec<PathBuf>,
    /// Images in which the detector found no faces at all.
    #[serde(default)]
    pub no_faces: Vec<PathBuf>,
}

impl Plan {
    /// An empty plan carrying only diagnostics.
    pub fn empty(unreadable: Vec<PathBuf>, no_faces: Vec<PathBuf>) -> Self {
        Self {
            unreadable,
            no_faces,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parses a plan from JSON and checks its item invariants.
    pub fn from_json(json: &str) -> Result<Self, FaceSortError> {
        let plan: Plan =
            serde_json::from_str(json).map_err(|e| FaceSortError::PlanFormat(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Parses a plan from YAML and checks its item invariants.
    pub fn from_yaml(yaml: &str) -> Result<Self, FaceSortError> {
        let plan: Plan =
            serde_yaml::from_str(yaml).map_err(|e| FaceSortError::PlanFormat(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reads a stored plan, choosing the format by extension (`.yaml`/`.yml`
    /// or JSON otherwise).
    pub fn load(path: &Path) -> Result<Self, FaceSortError> {
        let content = std::fs::read_to_string(path).map_err(|e| FaceSortError::io(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn to_json(&self) -> Result<String, FaceSortError> {
        serde_json::to_string_pretty(self).map_err(|e| FaceSortError::PlanFormat(e.to_string()))
    }

    fn validate(&self) -> Result<(), FaceSortError> {
        for item in &self.items {
            if item.clusters.is_empty() {
                return Err(FaceSortError::PlanFormat(format!(
                    "{}: empty cluster list",
                    item.path.display()
                )));
            }
            if item.clusters.windows(2).any(|w| w[0] >= w[1]) {
                return Err(FaceSortError::PlanFormat(format!(
                    "{}: cluster list not strictly ascending",
                    item.path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Inputs for [`build_plan`], all produced by the analysis phase.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// One label per embedding, `None` for noise.
    pub labels: &'a [Option<i32>],
    /// Owning image of each embedding, positionally paired with `labels`.
    pub owners: &'a [PathBuf],
    /// Accepted face count per image.
    pub face_counts: &'a HashMap<PathBuf, usize>,
    /// Every discovered image, in discovery order.
    pub all_images: &'a [PathBuf],
}

/// Maps distinct non-noise raw labels to dense ids `1..=K`, ascending by raw value.
pub fn remap_labels(labels: &[Option<i32>]) -> BTreeMap<i32, u32> {
    let distinct: BTreeSet<i32> = labels.iter().flatten().copied().collect();
    distinct.into_iter().zip(1u32..).collect()
}

/// Builds a canonical plan from raw oracle labels.
///
/// Diagnostics are passed through untouched.
pub fn build_plan(
    input: PlanInput<'_>,
    unreadable: Vec<PathBuf>,
    no_faces: Vec<PathBuf>,
) -> Plan {
    debug_assert_eq!(input.labels.len(), input.owners.len());
    if input.labels.is_empty() {
        return Plan::empty(unreadable, no_faces);
    }

    let label_map = remap_labels(input.labels);

    let mut clusters: BTreeMap<u32, BTreeSet<&PathBuf>> = BTreeMap::new();
    let mut by_image: HashMap<&PathBuf, BTreeSet<u32>> = HashMap::new();
    for (label, owner) in input.labels.iter().zip(input.owners) {
        let Some(raw) = label else {
            continue;
        };
        let id = label_map[raw];
        clusters.entry(id).or_default().insert(owner);
        by_image.entry(owner).or_default().insert(id);
    }

    let items = input
        .all_images
        .iter()
        .filter_map(|path| {
            let ids = by_image.get(path).filter(|ids| !ids.is_empty())?;
            Some(PlanItem {
                path: path.clone(),
                clusters: ids.iter().copied().collect(),
                face_count: input.face_counts.get(path).copied().unwrap_or(0),
            })
        })
        .collect();

    let clusters = clusters
        .into_iter()
        .map(|(id, members)| {
            let mut paths: Vec<PathBuf> = members.into_iter().cloned().collect();
            paths.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
            (id, paths)
        })
        .collect();

    Plan {
        clusters,
        items,
        unreadable,
        no_faces,
    }
}
