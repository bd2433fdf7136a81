//! Sequential sorting of a group of sibling folders.
//!
//! Each subfolder is analysed and distributed in name order, and the
//! cluster cursor returned by one distribution seeds the next, so global
//! cluster folder names never collide across the group.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FaceSortError;
use crate::analysis::Analyzer;
use crate::distribute::{ClusterCursor, DistributionResult, Distributor};
use crate::error::{ErrorScope, OpFailure};
use crate::plan::Plan;

/// What happened to one subfolder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubfolderOutcome {
    Completed {
        clusters: usize,
        planned: usize,
        moved: usize,
        copied: usize,
        skipped: usize,
        /// First global id handed to this folder.
        first_id: ClusterCursor,
        failures: Vec<OpFailure>,
        unreadable: Vec<PathBuf>,
        no_faces: Vec<PathBuf>,
    },
    /// Analysis aborted; no files were touched and no ids consumed.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubfolderReport {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: SubfolderOutcome,
}

/// Summary of a group run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub subfolders: Vec<SubfolderReport>,
    /// Subfolders left out by the name filter.
    pub excluded: Vec<String>,
    pub next_cursor: ClusterCursor,
}

impl SubfolderOutcome {
    fn completed(plan: &Plan, result: DistributionResult, first_id: ClusterCursor) -> Self {
        Self::Completed {
            clusters: plan.clusters.len(),
            planned: plan.items.len(),
            moved: result.moved,
            copied: result.copied,
            skipped: result.skipped,
            first_id,
            failures: result.failures,
            unreadable: plan.unreadable.clone(),
            no_faces: plan.no_faces.clone(),
        }
    }
}

/// Drives analysis and distribution across subfolders, one at a time.
pub struct Coordinator<'a> {
    analyzer: Analyzer<'a>,
    distributor: Distributor<'a>,
}

impl<'a> Coordinator<'a> {
    pub fn new(analyzer: Analyzer<'a>, distributor: Distributor<'a>) -> Self {
        Self {
            analyzer,
            distributor,
        }
    }

    /// Analyses `dir` and distributes it into numbered folders inside itself.
    pub fn sort_folder(
        &self,
        dir: &Path,
        cursor: ClusterCursor,
    ) -> Result<(Plan, DistributionResult), FaceSortError> {
        let plan = self.analyzer.analyze(dir)?;
        let result = self.distributor.distribute(&plan, dir, cursor)?;
        Ok((plan, result))
    }

    /// Sorts every immediate subfolder of `group_dir` in ascending name order.
    ///
    /// A subfolder whose analysis fails is reported and skipped without
    /// consuming cluster ids. Only run-scoped errors, such as an unreadable
    /// `group_dir` or running out of cluster ids, abort the whole run.
    pub fn run(&self, group_dir: &Path, start: ClusterCursor) -> Result<GroupReport, FaceSortError> {
        let mut cursor = start;
        let mut subfolders = Vec::new();
        let mut excluded = Vec::new();

        for (name, path) in list_subfolders(group_dir)? {
            if self.analyzer.filter.excludes(&name) {
                tracing::info!("skipping shared folder {}", path.display());
                excluded.push(name);
                continue;
            }

            tracing::info!("processing {} (next cluster id {})", path.display(), cursor);
            let outcome = match self.sort_folder(&path, cursor) {
                Ok((plan, result)) => {
                    let first_id = cursor;
                    cursor = result.next_cursor;
                    SubfolderOutcome::completed(&plan, result, first_id)
                }
                Err(e) if e.scope() == ErrorScope::Run => return Err(e),
                Err(e) => {
                    tracing::warn!("{}: {}", path.display(), e);
                    SubfolderOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            subfolders.push(SubfolderReport {
                name,
                path,
                outcome,
            });
        }

        Ok(GroupReport {
            subfolders,
            excluded,
            next_cursor: cursor,
        })
    }
}

/// Immediate subdirectories of `dir` with their names, sorted by name.
fn list_subfolders(dir: &Path) -> Result<Vec<(String, PathBuf)>, FaceSortError> {
    let group_err = |source: std::io::Error| FaceSortError::GroupDir {
        path: dir.to_path_buf(),
        source,
    };
    let entries = std::fs::read_dir(dir).map_err(group_err)?;
    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(group_err)?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push((entry.file_name(), path));
        }
    }
    subdirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(subdirs
        .into_iter()
        .map(|(name, path)| (name.to_string_lossy().into_owned(), path))
        .collect())
}
