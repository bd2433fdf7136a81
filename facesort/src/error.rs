use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by facesort operations.
///
/// Per-file distribution failures are not errors; they are collected as
/// [`OpFailure`] values on the distribution result instead.
#[derive(Debug, Error)]
pub enum FaceSortError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read group folder {path}: {source}")]
    GroupDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan error: {0}")]
    Scan(String),

    #[error("embedding oracle init failed: {0}")]
    OracleInit(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("distance matrix: {0}")]
    DistanceMatrix(String),

    #[error("cluster oracle failed: {0}")]
    Cluster(String),

    #[error("cluster oracle returned {got} labels for {expected} embeddings")]
    LabelCount { expected: usize, got: usize },

    #[error("cluster id overflow: {clusters} clusters starting at {start}")]
    ClusterIdOverflow { start: u32, clusters: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("plan format error: {0}")]
    PlanFormat(String),
}

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Abort the current subfolder only; the run continues with the next one.
    Subfolder,
    /// Abort the whole run.
    Run,
}

impl FaceSortError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the scope this error aborts.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Config(_) | Self::GroupDir { .. } | Self::ClusterIdOverflow { .. } => {
                ErrorScope::Run
            }
            _ => ErrorScope::Subfolder,
        }
    }
}

/// Filesystem operation attempted while distributing a plan item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOp {
    CreateDir,
    Move,
    Copy,
    Delete,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateDir => "create_dir",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single failed filesystem operation. The batch carries on past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpFailure {
    /// File or directory the operation targeted.
    pub path: PathBuf,
    pub op: FileOp,
    /// Platform error kind, e.g. "PermissionDenied".
    pub kind: String,
    pub reason: String,
}

impl OpFailure {
    pub(crate) fn new(path: impl Into<PathBuf>, op: FileOp, err: &io::Error) -> Self {
        Self {
            path: path.into(),
            op,
            kind: format!("{:?}", err.kind()),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for OpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.path.display(), self.reason)
    }
}
