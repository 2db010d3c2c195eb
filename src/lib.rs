//! cmmd tracks how the community membership of every node of a multiplex
//! network changes as the resolution of community detection is swept.
//! It parses per-resolution membership reports, builds the node × resolution
//! label matrix, groups nodes with identical trajectories and computes the
//! pairwise distance matrix between trajectories.

// Module declarations
pub mod error;
pub mod types;
pub mod parser;
pub mod detection;
pub mod distance;
pub mod trajectory;
pub mod pipeline;
pub mod output;
pub mod config;
pub mod utils;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    AnalysisResult, Clustering, DistanceMatrix, LabelMatrix, ReportHandle,
    TrajectoryGroups, TrajectoryKey, UNASSIGNED,
};
pub use parser::ReportParser;
pub use detection::{CommunityDetector, MoltiDetector, ResolutionSweep};
pub use distance::DistanceMetric;
pub use trajectory::TrajectoryAnalyzer;
pub use pipeline::{analyze_directory, cmmd, AnalysisSettings, CmmdRequest};

// Re-export the config from config module
pub use config::CmmdConfig;
