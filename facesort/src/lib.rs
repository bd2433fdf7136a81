//! Sort photo folders into per-person subfolders by face similarity.
//!
//! # Pipeline
//!
//! 1. [`Analyzer::analyze`]: images -> face embeddings -> cluster labels -> [`Plan`]
//! 2. [`Distributor::distribute`]: [`Plan`] -> numbered folders on disk
//! 3. [`Coordinator::run`]: repeats 1-2 over sibling folders, threading a
//!    [`ClusterCursor`] so folder numbers never collide across the group
//!
//! Face detection and clustering are injected oracles
//! ([`EmbeddingOracleProvider`], [`ClusterOracle`]). The crate ships a
//! sidecar-file embedding provider and a DBSCAN clusterer.
//!
//! # Usage
//!
//! ```no_run
//! use giztoy_facesort::{
//!     Analyzer, ClusterCursor, Config, Coordinator, Dbscan, Distributor,
//!     ImageCrateDecoder, MarkerFilter, OsFs, SidecarOracleProvider, TracingProgress,
//! };
//!
//! let cfg = Config::default();
//! let analysis = cfg.analysis();
//! let embeddings = SidecarOracleProvider::new(cfg.detections_file.clone());
//! let clusterer = Dbscan::new(cfg.eps);
//! let filter = MarkerFilter::new(&cfg.shared_marker);
//! let analyzer = Analyzer {
//!     config: &analysis,
//!     decoder: &ImageCrateDecoder,
//!     embeddings: &embeddings,
//!     clusterer: &clusterer,
//!     filter: &filter,
//!     progress: &TracingProgress,
//! };
//! let coordinator = Coordinator::new(analyzer, Distributor::new(&OsFs, &TracingProgress));
//! let report = coordinator.run("photos".as_ref(), ClusterCursor::new(cfg.start_id))?;
//! # Ok::<(), giztoy_facesort::FaceSortError>(())
//! ```

mod analysis;
mod config;
mod coordinator;
mod dbscan;
mod decode;
mod distance;
mod distribute;
mod error;
mod filter;
mod fs;
mod oracle;
mod plan;
mod progress;

pub use analysis::{discover_images, AnalysisConfig, Analyzer, DEFAULT_EXTENSIONS};
pub use config::Config;
pub use coordinator::{Coordinator, GroupReport, SubfolderOutcome, SubfolderReport};
pub use dbscan::{Dbscan, DEFAULT_EPS};
pub use decode::{FaceImage, ImageCrateDecoder, ImageDecoder};
pub use distance::{cosine_distances, l2_normalize, DistanceMatrix};
pub use distribute::{global_ids, ClusterCursor, DistributionResult, Distributor};
pub use error::{ErrorScope, FaceSortError, FileOp, OpFailure};
pub use filter::{
    has_excluded_ancestor, has_excluded_component, MarkerFilter, NameFilter, DEFAULT_SHARED_MARKER,
};
pub use fs::{FileSystem, OsFs};
pub use oracle::{
    raw_label, ClusterOracle, ClusterParams, Detection, DetectionIndex, EmbeddingOracle,
    EmbeddingOracleProvider, SidecarOracleProvider, DEFAULT_DETECTIONS_FILE, NOISE_LABEL,
};
pub use plan::{build_plan, remap_labels, Plan, PlanInput, PlanItem};
pub use progress::{NopProgress, Progress, TracingProgress};
